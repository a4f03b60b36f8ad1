//! Entry point for `rdt-sender`.
//!
//! Parses CLI arguments, wires up the data source and the transport, and
//! hands off to the library's connection loop.  `main.rs` owns only process
//! setup: logging, signal handling, argument parsing, exit status.

use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncRead;

use rdt_over_udp::connection::{Config, SenderConnection};
use rdt_over_udp::socket::Transport;

/// Reliable data transfer sender over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// The file to transfer; reads from standard input if absent.
    #[arg(short, long)]
    file: Option<String>,

    /// The destination port.
    #[arg(short, long, default_value_t = 33122)]
    port: u16,

    /// The receiver address or hostname.
    #[arg(short, long, default_value = "localhost")]
    address: String,

    /// Print debug messages.
    #[arg(short, long)]
    debug: bool,

    /// Enable selective acknowledgement mode.
    #[arg(short = 'k', long)]
    sack: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG still wins; --debug only raises the default filter.
    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let source: Box<dyn AsyncRead + Send + Unpin> = match &cli.file {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };

    let transport = Transport::connect(&cli.address, cli.port).await?;
    log::info!("[rdt] sending to {}", transport.peer);

    let mut conn = SenderConnection::new(transport, source, cli.sack, Config::default());

    tokio::select! {
        result = conn.run() => {
            result?;
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            // Interrupt exits cleanly; pending timers lapse with the process.
            log::info!("[rdt] interrupted");
            Ok(())
        }
    }
}
