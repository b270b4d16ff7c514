//! Per-transfer session state machines.
//!
//! Each session is an explicit state machine driven by step functions rather
//! than an internal blocking loop: the caller owns the socket, the timers,
//! and the file handle, and feeds events in (`on_datagram`, `on_timeout`,
//! `on_chunk`) in exchange for a batch of actions to perform. This keeps the
//! protocol logic itself free of I/O and directly unit-testable.

pub mod client;
pub mod config;
pub mod server;
