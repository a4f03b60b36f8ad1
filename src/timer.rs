//! Per-packet retransmission timers.
//!
//! Every outstanding packet gets its own one-shot timer.  Rather than letting
//! timer callbacks mutate shared state directly, each armed timer is a spawned
//! task that sleeps for the fixed timeout and then pushes its sequence number
//! into an expiry channel.  The connection's event loop consumes that channel
//! alongside inbound datagrams, so all state mutation stays serialised in the
//! single `tokio::select!` loop in [`crate::connection`].
//!
//! # Cancellation is best-effort
//!
//! [`cancel`](RetransmitTimers::cancel) aborts the sleeping task, but a timer
//! that has *already* pushed its expiry cannot be recalled from the channel.
//! The consumer must therefore re-check "is this sequence number still
//! outstanding?" before resending — a stale expiry for an acknowledged packet
//! is a benign no-op.
//!
//! The timeout is fixed; there is no RTT estimation and no back-off.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Fixed retransmission timeout applied to every packet.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Capacity of the expiry channel.  Far larger than the window can ever be,
/// so a timer task never blocks on a full channel in practice.
const EXPIRY_CHANNEL_CAPACITY: usize = 64;

/// One-shot retransmission timers, one per outstanding sequence number.
#[derive(Debug)]
pub struct RetransmitTimers {
    /// Sleeping tasks keyed by sequence number.
    pending: HashMap<u32, JoinHandle<()>>,
    /// Where expired sequence numbers are delivered.
    expiry_tx: mpsc::Sender<u32>,
    timeout: Duration,
}

impl RetransmitTimers {
    /// Create the timer set and the receiving half of the expiry channel.
    ///
    /// The caller (the connection event loop) owns the returned receiver and
    /// selects on it next to the socket.
    pub fn new(timeout: Duration) -> (Self, mpsc::Receiver<u32>) {
        let (expiry_tx, expiry_rx) = mpsc::channel(EXPIRY_CHANNEL_CAPACITY);
        (
            Self {
                pending: HashMap::new(),
                expiry_tx,
                timeout,
            },
            expiry_rx,
        )
    }

    /// Arm (or re-arm) the timer for `seqno`.
    ///
    /// Any previously armed timer for the same sequence number is cancelled
    /// first, so this doubles as the re-arm used after every resend.  When
    /// the timeout elapses the sequence number is pushed into the expiry
    /// channel exactly once.
    pub fn arm(&mut self, seqno: u32) {
        if let Some(old) = self.pending.remove(&seqno) {
            old.abort();
        }
        let tx = self.expiry_tx.clone();
        let timeout = self.timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            // The loop may have shut down; a closed channel just means the
            // expiry is irrelevant.
            let _ = tx.send(seqno).await;
        });
        self.pending.insert(seqno, handle);
    }

    /// Stop the timer for `seqno` if one is still pending.
    ///
    /// No-op when absent or already fired; an expiry already sitting in the
    /// channel is left for the consumer's outstanding-check to discard.
    pub fn cancel(&mut self, seqno: u32) {
        if let Some(handle) = self.pending.remove(&seqno) {
            handle.abort();
        }
    }

    /// Number of timers currently armed (fired-but-unconsumed not included).
    #[cfg(test)]
    fn armed(&self) -> usize {
        self.pending.iter().filter(|(_, h)| !h.is_finished()).count()
    }
}

impl Drop for RetransmitTimers {
    fn drop(&mut self) {
        // Let no sleeping task outlive the connection.
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}
