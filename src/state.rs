//! Connection finite-state-machine types.
//!
//! The sender's lifecycle is strictly linear — there is no error state and no
//! reopening.  Transitions are driven by [`crate::connection`]; keeping the
//! states in their own module makes it easy to add guard logic or tracing
//! without touching connection plumbing.
//!
//! ```text
//! Init ──SYN sent──▶ SynSent ──first DATA──▶ Transferring
//!                                                 │
//!                                       source EOF, FIN sent
//!                                                 ▼
//!                  Closed ◀──FIN acknowledged── FinSent
//! ```

/// All possible states of the sender FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Nothing sent yet; initial state.
    #[default]
    Init,
    /// SYN is on the wire; data pumping may begin.
    SynSent,
    /// Data packets are flowing; the source is not yet exhausted.
    Transferring,
    /// FIN is on the wire; waiting for the ack that covers it.
    FinSent,
    /// FIN acknowledged.  Terminal.
    Closed,
}

impl std::fmt::Display for SenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
