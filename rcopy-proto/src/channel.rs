//! The datagram transport seam.
//!
//! Socket setup, address resolution and the readiness-poll mechanism are all
//! external collaborators: the core only needs "send one datagram to a peer"
//! and "wait up to T for a datagram, telling me who sent it". Concrete
//! implementations (a real `UdpSocket`, wrapped in the error-injection
//! harness) live in the `rcopy-cli` crate.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// A single datagram endpoint, as used by one session (client or server
/// child). Implementations own exactly one socket; there is no shared
/// mutable state between sessions.
pub trait DatagramChannel {
	/// Send one datagram to `addr`.
	fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()>;

	/// Wait up to `timeout` for one datagram. Returns `Ok(None)` on timeout,
	/// never blocking past `timeout`. This is the protocol's only
	/// suspension point besides file I/O.
	fn recv_from(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>>;

	/// Discard the current endpoint and bind a fresh ephemeral one,
	/// connected to the same remote peer. Used by the client after a
	/// filename-bootstrap timeout.
	fn rebind(&mut self) -> io::Result<()>;

	/// The address this channel is currently bound to.
	fn local_addr(&self) -> io::Result<SocketAddr>;
}
