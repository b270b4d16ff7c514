//! Protocol core for `rcopy`, a reliable file-transfer protocol layered over
//! UDP using Selective-Reject ARQ.
//!
//! This crate has no knowledge of sockets, threads, or the filesystem: it
//! models PDU framing ([`framing`]), the sender's sliding window
//! ([`window`]), the receiver's out-of-order reassembly buffer ([`buffer`]),
//! and the client/server transfer state machines ([`session`]) as pure,
//! synchronously-steppable types. Concrete I/O lives in `rcopy-cli`, behind
//! the [`channel::DatagramChannel`] seam.
//!
//! ## Wire layout
//!
//! Every PDU starts with a 7-byte header: a 4-byte sequence number, a 2-byte
//! Internet checksum (RFC 1071), and a 1-byte flag, all in network byte
//! order. The flag selects the body layout — see [`framing::Flag`] and
//! [`framing::Decoded`].

pub mod buffer;
pub mod channel;
pub mod error;
pub mod framing;
pub mod session;
pub mod util;
pub mod window;
