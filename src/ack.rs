//! Acknowledgment interpretation: cumulative acks, selective acks, duplicate
//! detection, and fast retransmit.
//!
//! [`AckProcessor`] consumes one validated ack field at a time and mutates the
//! window and timer state accordingly.  It performs **no I/O**: anything that
//! requires the socket (the fast-retransmit resend, shutting the connection
//! down) is reported back to [`crate::connection::SenderConnection`] as a
//! [`Directive`].
//!
//! # Ack semantics
//!
//! The cumulative ack value means "every sequence number strictly below this
//! one has arrived" — it names the *next expected* sequence number, not the
//! last received one.  In SACK mode the field additionally carries a list of
//! individually received out-of-order sequence numbers:
//!
//! ```text
//! plain:  "5"
//! sack:   "5;7,9"     (cumulative 5; 7 and 9 received out of order)
//! sack:   "5;"        (cumulative 5; empty selective list)
//! ```
//!
//! A duplicate of the current cumulative value increments a counter; when the
//! counter reaches exactly 4 (the original ack plus three duplicates) the
//! packet at the cumulative value is presumed lost and resent immediately.
//! The counter keeps climbing past 4 without retriggering — one fast
//! retransmit per loss signal, further recovery is left to the packet's own
//! timer.

use std::fmt;

use crate::timer::RetransmitTimers;
use crate::window::SendWindow;

/// Number of identical acks (the first included) that triggers fast
/// retransmit.
pub const FAST_RETRANSMIT_THRESHOLD: u32 = 4;

/// What the control loop should do after an ack has been absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Nothing further; keep pumping.
    Continue,
    /// Resend this sequence number now and re-arm its timer.
    FastRetransmit(u32),
    /// The FIN has been acknowledged; the transfer is complete.
    Complete,
}

/// A structurally invalid ack field on a packet that passed the checksum.
///
/// This is a protocol-format error, not line noise; the connection treats it
/// as fatal (see the error taxonomy in the crate docs).
#[derive(Debug, PartialEq, Eq)]
pub struct MalformedAck {
    pub field: String,
}

impl fmt::Display for MalformedAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed ack field: {:?}", self.field)
    }
}

impl std::error::Error for MalformedAck {}

/// Send-side acknowledgment state for one connection.
#[derive(Debug)]
pub struct AckProcessor {
    /// Whether inbound ack fields carry a selective list.
    sack_mode: bool,
    /// Last distinct cumulative value observed.
    latest_ack: Option<u32>,
    /// Consecutive acks (the first included) carrying `latest_ack`.
    dup_count: u32,
    /// Sequence number of the FIN, once sent.
    fin_seqno: Option<u32>,
}

impl AckProcessor {
    pub fn new(sack_mode: bool) -> Self {
        Self {
            sack_mode,
            latest_ack: None,
            dup_count: 0,
            fin_seqno: None,
        }
    }

    /// Record the FIN's sequence number.  Called exactly once, when the data
    /// source is exhausted and the FIN goes out.
    pub fn mark_fin(&mut self, seqno: u32) {
        debug_assert!(self.fin_seqno.is_none(), "FIN sequence recorded twice");
        self.fin_seqno = Some(seqno);
    }

    /// `true` once the FIN has been sent (no more data may be pumped).
    pub fn fin_sent(&self) -> bool {
        self.fin_seqno.is_some()
    }

    /// Absorb one validated ack field.
    ///
    /// Duplicate acks return early: only a value-advancing ack runs the
    /// selective and cumulative passes.  All timer cancellation for removed
    /// entries happens here, before the entries leave the window.
    pub fn process(
        &mut self,
        field: &str,
        window: &mut SendWindow,
        timers: &mut RetransmitTimers,
    ) -> Result<Directive, MalformedAck> {
        let (ack_value, sacks) = self.parse_field(field)?;

        // Duplicate-ack path: count, maybe fast-retransmit, and stop.
        if self.latest_ack == Some(ack_value) {
            self.dup_count += 1;
            if self.dup_count == FAST_RETRANSMIT_THRESHOLD {
                log::debug!(
                    "[ack] {} duplicate acks for {ack_value} — fast retransmit",
                    self.dup_count
                );
                timers.cancel(ack_value);
                return Ok(Directive::FastRetransmit(ack_value));
            }
            return Ok(Directive::Continue);
        }
        self.latest_ack = Some(ack_value);
        self.dup_count = 1;

        // Selective pass: out-of-order receptions, cumulative point unmoved.
        for sacked in sacks {
            if window.contains(sacked) {
                timers.cancel(sacked);
                window.remove(sacked);
                log::debug!("[ack] selective ack clears {sacked}");
            }
        }

        // Cumulative pass: everything below ack_value is delivered.
        if let Some(highest) = ack_value.checked_sub(1) {
            let covered: Vec<u32> = window
                .outstanding()
                .take_while(|&s| s <= highest)
                .collect();
            for seqno in covered {
                timers.cancel(seqno);
                window.remove(seqno);
            }

            if self.fin_seqno == Some(highest) {
                log::debug!("[ack] FIN acknowledged (ack={ack_value})");
                return Ok(Directive::Complete);
            }
        }

        Ok(Directive::Continue)
    }

    /// Split `"5"` / `"5;7,9"` / `"5;"` into the cumulative value and the
    /// selective list.
    fn parse_field(&self, field: &str) -> Result<(u32, Vec<u32>), MalformedAck> {
        let malformed = || MalformedAck {
            field: field.to_owned(),
        };

        if !self.sack_mode {
            return Ok((field.parse().map_err(|_| malformed())?, Vec::new()));
        }

        let (cum, list) = field.split_once(';').ok_or_else(malformed)?;
        let ack_value = cum.parse().map_err(|_| malformed())?;
        let sacks = if list.is_empty() {
            Vec::new()
        } else {
            list.split(',')
                .map(|s| s.parse().map_err(|_| malformed()))
                .collect::<Result<_, _>>()?
        };
        Ok((ack_value, sacks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Window with entries for each listed seqno, plus a timer set to pass in.
    fn fixture(seqnos: &[u32]) -> (SendWindow, RetransmitTimers) {
        let mut window = SendWindow::new(7);
        for &s in seqnos {
            window.insert(s, format!("dat|{s}|x|0").into_bytes());
        }
        let (timers, _rx) = RetransmitTimers::new(Duration::from_secs(5));
        // _rx dropped: expiries are irrelevant to these state tests.
        (window, timers)
    }

    #[test]
    fn cumulative_ack_clears_everything_below() {
        let (mut w, mut t) = fixture(&[0, 1, 2, 3]);
        let mut ap = AckProcessor::new(false);

        let d = ap.process("2", &mut w, &mut t).unwrap();
        assert_eq!(d, Directive::Continue);
        assert!(!w.contains(0));
        assert!(!w.contains(1));
        assert!(w.contains(2), "ack value itself is not yet acknowledged");
        assert!(w.contains(3));
    }

    #[test]
    fn cumulative_leaves_only_at_or_above_ack_value() {
        let (mut w, mut t) = fixture(&[0, 1, 2, 3, 4, 5]);
        let mut ap = AckProcessor::new(false);
        ap.process("4", &mut w, &mut t).unwrap();
        let left: Vec<u32> = w.outstanding().collect();
        assert_eq!(left, vec![4, 5]);
    }

    #[test]
    fn repeated_ack_is_idempotent() {
        let (mut w, mut t) = fixture(&[0, 1, 2]);
        let mut ap = AckProcessor::new(false);
        ap.process("2", &mut w, &mut t).unwrap();
        let after_first: Vec<u32> = w.outstanding().collect();

        // Same value again: duplicate path, window untouched, no panic.
        let d = ap.process("2", &mut w, &mut t).unwrap();
        assert_eq!(d, Directive::Continue);
        assert_eq!(w.outstanding().collect::<Vec<u32>>(), after_first);
    }

    #[test]
    fn fast_retransmit_fires_exactly_at_fourth_duplicate() {
        let (mut w, mut t) = fixture(&[1, 2, 3]);
        let mut ap = AckProcessor::new(false);

        assert_eq!(ap.process("1", &mut w, &mut t).unwrap(), Directive::Continue);
        assert_eq!(ap.process("1", &mut w, &mut t).unwrap(), Directive::Continue);
        assert_eq!(ap.process("1", &mut w, &mut t).unwrap(), Directive::Continue);
        assert_eq!(
            ap.process("1", &mut w, &mut t).unwrap(),
            Directive::FastRetransmit(1)
        );
    }

    #[test]
    fn fifth_and_later_duplicates_do_not_retrigger() {
        let (mut w, mut t) = fixture(&[1]);
        let mut ap = AckProcessor::new(false);
        for _ in 0..4 {
            ap.process("1", &mut w, &mut t).unwrap();
        }
        for _ in 0..3 {
            assert_eq!(ap.process("1", &mut w, &mut t).unwrap(), Directive::Continue);
        }
    }

    #[test]
    fn new_value_resets_duplicate_count() {
        let (mut w, mut t) = fixture(&[1, 2]);
        let mut ap = AckProcessor::new(false);
        for _ in 0..3 {
            ap.process("1", &mut w, &mut t).unwrap();
        }
        // Progress: counter restarts at 1 for the new value.
        ap.process("2", &mut w, &mut t).unwrap();
        for _ in 0..2 {
            assert_eq!(ap.process("2", &mut w, &mut t).unwrap(), Directive::Continue);
        }
        assert_eq!(
            ap.process("2", &mut w, &mut t).unwrap(),
            Directive::FastRetransmit(2)
        );
    }

    #[test]
    fn duplicate_ack_skips_selective_and_cumulative_passes() {
        let (mut w, mut t) = fixture(&[1, 2, 3]);
        let mut ap = AckProcessor::new(true);
        ap.process("1;", &mut w, &mut t).unwrap();
        // Duplicate carrying a selective ack for 3: the early return means
        // 3 stays outstanding until a value-advancing ack arrives.
        ap.process("1;3", &mut w, &mut t).unwrap();
        assert!(w.contains(3));
    }

    #[test]
    fn selective_ack_removes_only_listed_seqnos() {
        let (mut w, mut t) = fixture(&[2, 3, 4, 5]);
        let mut ap = AckProcessor::new(true);

        let d = ap.process("2;4", &mut w, &mut t).unwrap();
        assert_eq!(d, Directive::Continue);
        assert!(w.contains(2), "cumulative point must not advance");
        assert!(w.contains(3));
        assert!(!w.contains(4), "selectively acked entry must be removed");
        assert!(w.contains(5));
    }

    #[test]
    fn selective_ack_for_unknown_seqno_is_ignored() {
        let (mut w, mut t) = fixture(&[2]);
        let mut ap = AckProcessor::new(true);
        ap.process("2;9", &mut w, &mut t).unwrap();
        assert!(w.contains(2));
    }

    #[test]
    fn empty_selective_list_is_valid() {
        let (mut w, mut t) = fixture(&[0, 1]);
        let mut ap = AckProcessor::new(true);
        let d = ap.process("1;", &mut w, &mut t).unwrap();
        assert_eq!(d, Directive::Continue);
        assert!(!w.contains(0));
        assert!(w.contains(1));
    }

    #[test]
    fn fin_ack_reports_complete() {
        let (mut w, mut t) = fixture(&[3, 4]);
        let mut ap = AckProcessor::new(false);
        ap.mark_fin(4);

        assert_eq!(ap.process("4", &mut w, &mut t).unwrap(), Directive::Continue);
        assert_eq!(ap.process("5", &mut w, &mut t).unwrap(), Directive::Complete);
        assert!(w.is_empty(), "completion implies nothing left outstanding");
    }

    #[test]
    fn ack_zero_clears_nothing() {
        let (mut w, mut t) = fixture(&[0, 1]);
        let mut ap = AckProcessor::new(false);
        let d = ap.process("0", &mut w, &mut t).unwrap();
        assert_eq!(d, Directive::Continue);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn malformed_fields_are_errors() {
        let (mut w, mut t) = fixture(&[0]);

        let mut plain = AckProcessor::new(false);
        assert!(plain.process("abc", &mut w, &mut t).is_err());
        assert!(plain.process("", &mut w, &mut t).is_err());

        let mut sack = AckProcessor::new(true);
        // SACK mode requires the ';' separator.
        assert!(sack.process("5", &mut w, &mut t).is_err());
        assert!(sack.process("5;1,x", &mut w, &mut t).is_err());
        assert!(sack.process(";1", &mut w, &mut t).is_err());
    }

    #[test]
    fn staircase_to_completion() {
        // Seq 0 (SYN), 1..=3 (DATA), 4 (FIN); acks "2" then "5".
        let (mut w, mut t) = fixture(&[0, 1, 2, 3, 4]);
        let mut ap = AckProcessor::new(false);
        ap.mark_fin(4);

        assert_eq!(ap.process("2", &mut w, &mut t).unwrap(), Directive::Continue);
        assert_eq!(w.outstanding().collect::<Vec<u32>>(), vec![2, 3, 4]);

        assert_eq!(ap.process("5", &mut w, &mut t).unwrap(), Directive::Complete);
        assert!(w.is_empty());
    }
}
