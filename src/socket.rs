//! Async UDP transport abstraction.
//!
//! [`Transport`] is a thin wrapper around `tokio::net::UdpSocket`, connected
//! to the single receiver this sender talks to.  It deliberately speaks raw
//! bytes rather than decoded packets: an inbound datagram that fails checksum
//! validation must be treated as packet loss by the control loop, not as a
//! transport error, so decoding is the caller's concern.  All protocol logic
//! lives elsewhere; this module owns only byte I/O and address resolution.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use tokio::net::{lookup_host, UdpSocket};

/// Largest datagram we are prepared to receive.
const MAX_DATAGRAM: usize = 4096;

/// Errors that can arise from transport operations.
///
/// Every variant is fatal to the connection; loss-like conditions never
/// surface here.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying I/O error from the OS.
    Io(io::Error),
    /// The destination hostname did not resolve to any address.
    Unresolvable(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "socket I/O error: {e}"),
            Self::Unresolvable(host) => write!(f, "cannot resolve destination: {host}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// An async datagram channel to one receiver.
#[derive(Debug)]
pub struct Transport {
    inner: UdpSocket,
    /// Resolved receiver address.
    pub peer: SocketAddr,
}

impl Transport {
    /// Resolve `dest:port`, bind an ephemeral local socket, and connect it to
    /// the receiver.
    pub async fn connect(dest: &str, port: u16) -> Result<Self, TransportError> {
        let peer = lookup_host((dest, port))
            .await?
            .next()
            .ok_or_else(|| TransportError::Unresolvable(format!("{dest}:{port}")))?;
        let bind_addr: SocketAddr = if peer.is_ipv4() {
            "0.0.0.0:0".parse().unwrap()
        } else {
            "[::]:0".parse().unwrap()
        };
        let inner = UdpSocket::bind(bind_addr).await?;
        inner.connect(peer).await?;
        Ok(Self { inner, peer })
    }

    /// Send one encoded packet as a single datagram.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.inner.send(bytes).await?;
        Ok(())
    }

    /// Block until the next datagram arrives and return its raw bytes.
    pub async fn recv(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let n = self.inner.recv(&mut buf).await?;
        buf.truncate(n);
        Ok(buf)
    }
}
