//! `rdt-over-udp` — the send half of a reliable data transfer protocol
//! layered on plain UDP.
//!
//! Delivers a byte stream to a receiver exactly once and in order despite
//! loss, duplication, and reordering, using a fixed sliding window,
//! per-packet retransmission timers, duplicate-ack-triggered fast retransmit,
//! and an optional selective-acknowledgment (SACK) extension.
//!
//! # Architecture
//!
//! ```text
//!  ┌─────────────┐  chunks  ┌──────────────────┐  packets  ┌───────────┐
//!  │ data source │─────────▶│ SenderConnection │──────────▶│ Transport │
//!  └─────────────┘          │  (event loop)    │◀──────────│   (UDP)   │
//!                           └───┬────┬────┬────┘   acks    └───────────┘
//!                               │    │    │
//!                      SendWindow  Timers  AckProcessor
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]     — wire format (serialise / deserialise, checksums)
//! - [`window`]     — outstanding-packet bookkeeping, window bound
//! - [`timer`]      — per-packet retransmission timers
//! - [`ack`]        — cumulative/selective ack handling, fast retransmit
//! - [`connection`] — handshake, data pump, event loop, teardown
//! - [`state`]      — finite-state-machine types
//! - [`socket`]     — async UDP transport abstraction

pub mod ack;
pub mod connection;
pub mod packet;
pub mod socket;
pub mod state;
pub mod timer;
pub mod window;
