//! Per-connection lifecycle: handshake, data pump, retransmission, teardown.
//!
//! # Architecture
//!
//! ```text
//!  data source ──read chunk──▶ SenderConnection ──encoded packets──▶ Transport
//!                                │    ▲      │
//!                    SendWindow ─┘    │      └─ RetransmitTimers
//!                  (in-flight)        │            (one task per packet)
//!                                     │ expiry channel
//!              inbound acks ──────────┴──── tokio::select! event loop
//! ```
//!
//! [`SenderConnection::run`] owns the single event loop.  Two event sources
//! exist: inbound datagrams from the transport and per-packet timer expiries
//! from [`crate::timer`].  Both are consumed by one `tokio::select!`, so every
//! mutation of the window, the timers, and the ack state happens on one task —
//! no locks, no lost updates.
//!
//! After every event the loop tops the window back up: while there is room it
//! reads one chunk from the data source and sends a `dat` packet; an empty
//! read means the source is exhausted, so a `fin` goes out instead and the
//! pump stops for good.  The loop returns once the ack covering the FIN
//! arrives.
//!
//! Stale timer expiries (the packet was acknowledged while the expiry sat in
//! the channel) are filtered by re-checking the window before resending.

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::ack::{AckProcessor, Directive, MalformedAck};
use crate::packet::{self, DecodeError, PacketKind, MAX_PAYLOAD};
use crate::socket::{Transport, TransportError};
use crate::state::SenderState;
use crate::timer::{RetransmitTimers, RETRANSMIT_TIMEOUT};
use crate::window::{SendWindow, DEFAULT_WINDOW_LIMIT};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for one connection.
///
/// Defaults match the protocol constants; tests shrink the timeout and the
/// window to keep runs fast.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of in-flight packets.
    pub window_limit: usize,
    /// Maximum bytes of payload per `dat` packet.
    pub max_payload: usize,
    /// Fixed per-packet retransmission timeout.
    pub retransmit_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_limit: DEFAULT_WINDOW_LIMIT,
            max_payload: MAX_PAYLOAD,
            retransmit_timeout: RETRANSMIT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Fatal connection errors.
///
/// Checksum failures and stale timer expiries never appear here — both are
/// absorbed by the event loop as expected wire conditions.
#[derive(Debug)]
pub enum ConnError {
    /// Socket-level send/receive failure.
    Transport(TransportError),
    /// A checksum-valid datagram that is structurally broken.
    Protocol(DecodeError),
    /// A checksum-valid ack whose ack field does not parse.
    MalformedAck(MalformedAck),
    /// Reading from the data source failed.
    Source(io::Error),
}

impl fmt::Display for ConnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport failure: {e}"),
            Self::Protocol(e) => write!(f, "protocol-format error: {e}"),
            Self::MalformedAck(e) => write!(f, "protocol-format error: {e}"),
            Self::Source(e) => write!(f, "data source error: {e}"),
        }
    }
}

impl std::error::Error for ConnError {}

impl From<TransportError> for ConnError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<MalformedAck> for ConnError {
    fn from(e: MalformedAck) -> Self {
        Self::MalformedAck(e)
    }
}

// ---------------------------------------------------------------------------
// SenderConnection
// ---------------------------------------------------------------------------

/// The send half of one reliable transfer.
pub struct SenderConnection {
    /// Current FSM state.
    pub state: SenderState,
    transport: Transport,
    window: SendWindow,
    timers: RetransmitTimers,
    expiry_rx: tokio::sync::mpsc::Receiver<u32>,
    ack: AckProcessor,
    source: Box<dyn AsyncRead + Send + Unpin>,
    /// Sequence number for the next outbound packet (SYN = 0).
    next_seqno: u32,
    max_payload: usize,
}

impl SenderConnection {
    /// Build a connection around an already-connected transport and a byte
    /// source.  Nothing is sent until [`run`](Self::run).
    pub fn new(
        transport: Transport,
        source: Box<dyn AsyncRead + Send + Unpin>,
        sack_mode: bool,
        config: Config,
    ) -> Self {
        let (timers, expiry_rx) = RetransmitTimers::new(config.retransmit_timeout);
        Self {
            state: SenderState::Init,
            transport,
            window: SendWindow::new(config.window_limit),
            timers,
            expiry_rx,
            ack: AckProcessor::new(sack_mode),
            source,
            next_seqno: 0,
            max_payload: config.max_payload,
        }
    }

    /// Drive the transfer to completion.
    ///
    /// Returns `Ok(())` once the receiver has acknowledged the FIN; any
    /// [`ConnError`] is fatal and leaves the transfer incomplete.
    pub async fn run(&mut self) -> Result<(), ConnError> {
        self.send_packet(PacketKind::Syn, &[]).await?;
        self.state = SenderState::SynSent;

        loop {
            tokio::select! {
                datagram = self.transport.recv() => {
                    if self.handle_datagram(&datagram?).await? {
                        self.state = SenderState::Closed;
                        log::info!("[rdt] transfer complete");
                        return Ok(());
                    }
                    // Top-up happens after every inbound datagram, valid or
                    // not; timer expiries never open window capacity.
                    if !self.ack.fin_sent() {
                        self.pump().await?;
                    }
                }
                Some(seqno) = self.expiry_rx.recv() => {
                    self.resend(seqno).await?;
                }
            }
        }
    }

    /// Decode and dispatch one inbound datagram.
    ///
    /// Returns `Ok(true)` when the transfer is complete.  A datagram that
    /// cannot be validated is the moral equivalent of one that never arrived;
    /// a datagram that passes validation but fails to parse is a
    /// protocol-format error and fatal.
    async fn handle_datagram(&mut self, datagram: &[u8]) -> Result<bool, ConnError> {
        let pkt = match packet::decode(datagram) {
            Ok(pkt) => pkt,
            Err(DecodeError::ChecksumMismatch | DecodeError::Truncated) => {
                log::debug!("[rdt] checksum failed ({} bytes) — dropped", datagram.len());
                return Ok(false);
            }
            Err(e) => return Err(ConnError::Protocol(e)),
        };

        if pkt.kind != PacketKind::Ack {
            log::debug!("[rdt] ← unexpected {} packet ignored", pkt.kind);
            return Ok(false);
        }
        log::debug!("[rdt] ← ack {}", pkt.field);

        match self.ack.process(&pkt.field, &mut self.window, &mut self.timers)? {
            Directive::Continue => Ok(false),
            Directive::FastRetransmit(seqno) => {
                self.resend(seqno).await?;
                Ok(false)
            }
            Directive::Complete => Ok(true),
        }
    }

    /// Top up the window from the data source.
    ///
    /// Sends `dat` packets while there is room; on an empty read the FIN goes
    /// out (recording its sequence number) and pumping ends permanently.
    async fn pump(&mut self) -> Result<(), ConnError> {
        while self.window.has_room() {
            let chunk = self.read_chunk().await?;
            if chunk.is_empty() {
                let fin_seqno = self.next_seqno;
                self.send_packet(PacketKind::Fin, &[]).await?;
                self.ack.mark_fin(fin_seqno);
                self.state = SenderState::FinSent;
                return Ok(());
            }
            self.send_packet(PacketKind::Dat, &chunk).await?;
            if self.state == SenderState::SynSent {
                self.state = SenderState::Transferring;
            }
        }
        Ok(())
    }

    /// Read the next chunk, at most `max_payload` bytes.  Empty means the
    /// source is exhausted; a short read mid-stream is a valid smaller chunk.
    async fn read_chunk(&mut self) -> Result<Vec<u8>, ConnError> {
        let mut buf = vec![0u8; self.max_payload];
        let n = self.source.read(&mut buf).await.map_err(ConnError::Source)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Shared send helper for SYN/DATA/FIN: encode with the next sequence
    /// number, transmit, record as outstanding, arm the timer, advance the
    /// sequence counter.
    async fn send_packet(&mut self, kind: PacketKind, payload: &[u8]) -> Result<(), ConnError> {
        let seqno = self.next_seqno;
        let bytes = packet::encode(kind, seqno, payload);
        self.transport.send(&bytes).await?;
        log::debug!(
            "[rdt] → {kind} seq={seqno} len={} in_flight={}",
            payload.len(),
            self.window.len() + 1
        );
        self.window.insert(seqno, bytes);
        self.timers.arm(seqno);
        self.next_seqno += 1;
        Ok(())
    }

    /// Resend the recorded bytes for `seqno` and re-arm its timer.
    ///
    /// Shared by timer expiries and fast retransmit.  If the packet is no
    /// longer outstanding the expiry lost a race with an acknowledgement and
    /// there is nothing to do.
    async fn resend(&mut self, seqno: u32) -> Result<(), ConnError> {
        let Some(bytes) = self.window.get(seqno) else {
            self.timers.cancel(seqno);
            return Ok(());
        };
        self.transport.send(bytes).await?;
        log::debug!("[rdt] ↻ resend seq={seqno}");
        self.timers.arm(seqno);
        Ok(())
    }
}
