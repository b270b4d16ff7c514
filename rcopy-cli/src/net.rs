//! The concrete `UdpSocket`-backed [`DatagramChannel`], optionally wrapped
//! with the `rcopy-harness` error injector on the way out.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use rcopy_harness::{ChannelError, Decision};
use rcopy_proto::channel::DatagramChannel;
use tracing::trace;

pub struct UdpChannel {
	socket: UdpSocket,
	errors: Option<ChannelError>,
}

impl UdpChannel {
	pub fn bind(addr: SocketAddr) -> io::Result<Self> {
		Ok(Self { socket: UdpSocket::bind(addr)?, errors: None })
	}

	pub fn bind_ephemeral() -> io::Result<Self> {
		Self::bind(SocketAddr::from(([0, 0, 0, 0], 0)))
	}

	pub fn with_error_injection(mut self, errors: ChannelError) -> Self {
		self.errors = Some(errors);
		self
	}
}

impl DatagramChannel for UdpChannel {
	fn send_to(&mut self, buf: &[u8], addr: SocketAddr) -> io::Result<()> {
		match self.errors.as_mut().map(ChannelError::decide) {
			Some(Decision::Drop) => {
				trace!(%addr, len = buf.len(), "harness dropped outgoing datagram");
				Ok(())
			}
			Some(Decision::Flip) => {
				let mut corrupted = buf.to_vec();
				ChannelError::corrupt(&mut corrupted);
				trace!(%addr, len = buf.len(), "harness corrupted outgoing datagram");
				self.socket.send_to(&corrupted, addr).map(|_| ())
			}
			Some(Decision::Keep) | None => self.socket.send_to(buf, addr).map(|_| ()),
		}
	}

	fn recv_from(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<(usize, SocketAddr)>> {
		self.socket.set_read_timeout(Some(timeout))?;
		match self.socket.recv_from(buf) {
			Ok((n, from)) => Ok(Some((n, from))),
			Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => Ok(None),
			Err(e) => Err(e),
		}
	}

	fn rebind(&mut self) -> io::Result<()> {
		self.socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0)))?;
		Ok(())
	}

	fn local_addr(&self) -> io::Result<SocketAddr> {
		self.socket.local_addr()
	}
}
