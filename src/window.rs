//! Sliding-window bookkeeping for sent-but-unacknowledged packets.
//!
//! [`SendWindow`] owns the mapping from sequence number to the exact bytes
//! last put on the wire for that number.  It does **not** touch the socket or
//! any timers; [`crate::connection::SenderConnection`] coordinates timer
//! cancellation before entries are removed.
//!
//! # Window contract
//! - A sequence number has an entry iff it has been sent at least once and
//!   not yet acknowledged.
//! - `len() <= limit` at every point observed by the control loop (a
//!   timer-driven resend reuses the existing entry, it never adds one).
//! - `remove` on an absent entry is a no-op, not an error: that is the
//!   expected outcome of a timer firing racing an acknowledgement.
//! - Iteration over outstanding sequence numbers is ascending, which is what
//!   the cumulative-ack sweep relies on.

use std::collections::BTreeMap;

/// Default maximum number of in-flight packets.
pub const DEFAULT_WINDOW_LIMIT: usize = 7;

/// Outstanding-packet store for one connection.
#[derive(Debug)]
pub struct SendWindow {
    /// Encoded wire bytes keyed by sequence number, ascending.
    entries: BTreeMap<u32, Vec<u8>>,
    /// Maximum number of simultaneous entries.
    limit: usize,
}

impl SendWindow {
    /// Create a window bounded at `limit` in-flight packets (≥ 1).
    pub fn new(limit: usize) -> Self {
        assert!(limit >= 1, "window limit must be at least 1");
        Self {
            entries: BTreeMap::new(),
            limit,
        }
    }

    /// Record a newly sent packet.
    ///
    /// The caller must have checked [`has_room`](Self::has_room) first.
    /// Panics in debug mode if `seqno` is already present or the window is
    /// full — both indicate a control-loop bug, not a wire condition.
    pub fn insert(&mut self, seqno: u32, bytes: Vec<u8>) {
        debug_assert!(
            self.has_room(),
            "insert called on a full window ({} / {})",
            self.entries.len(),
            self.limit
        );
        let prev = self.entries.insert(seqno, bytes);
        debug_assert!(prev.is_none(), "seqno {seqno} recorded twice");
    }

    /// Drop the entry for `seqno` if present.
    ///
    /// Returns `true` when an entry was actually removed.  Absent entries
    /// are a benign race, never an error.
    pub fn remove(&mut self, seqno: u32) -> bool {
        self.entries.remove(&seqno).is_some()
    }

    /// The exact bytes last sent for `seqno`, if still outstanding.
    pub fn get(&self, seqno: u32) -> Option<&[u8]> {
        self.entries.get(&seqno).map(Vec::as_slice)
    }

    /// `true` when `seqno` is still awaiting acknowledgement.
    pub fn contains(&self, seqno: u32) -> bool {
        self.entries.contains_key(&seqno)
    }

    /// Number of packets currently in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is awaiting acknowledgement.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` when at least one more packet may be sent.
    pub fn has_room(&self) -> bool {
        self.entries.len() < self.limit
    }

    /// Outstanding sequence numbers in ascending order.
    pub fn outstanding(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}
