//! The client-side bootstrap and receive state machine.
//!
//! Rather than a monolithic blocking loop, the session is driven by explicit
//! step functions that each return the next batch of [`ClientAction`]s —
//! tagged-variant dispatch. The caller (in `rcopy-cli`) owns the
//! socket, the timers, and the destination file; this keeps the state
//! machine itself free of I/O and fully unit-testable.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::buffer::{Outcome, ReceiverBuffer};
use crate::error::SessionError;
use crate::framing::{self, Decoded, Flag};
use crate::session::config::ClientConfig;
use crate::util::BytesFmt;

const FILENAME_TIMEOUT: Duration = Duration::from_millis(1000);
const DATA_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FILENAME_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	SendFilename,
	WaitForAck,
	/// Covers what were once four separate states (process-arrival,
	/// in-order, buffered, flush) — all four reduce to "hand the arriving
	/// packet to the receiver buffer and act on its Outcome", so a single
	/// state suffices (see DESIGN.md).
	WaitForData,
	Done,
}

/// What the driver should do in response to a step. Several variants may be
/// returned from one step (e.g. deliver bytes *and* send an RR).
#[derive(Debug, PartialEq)]
pub enum ClientAction {
	/// Send `bytes` to `addr`.
	Send { addr: SocketAddr, bytes: Vec<u8> },
	/// Wait up to `timeout` for the next datagram, then call [`ClientSession::on_timeout`]
	/// if none arrives or [`ClientSession::on_datagram`] if one does.
	AwaitDatagram { timeout: Duration },
	/// Close the current socket and bind a fresh ephemeral one to the same peer.
	Rebind,
	/// Truncate-open the destination file; the transfer is about to begin.
	OpenDestination,
	/// Append `bytes` to the destination file, in order.
	Deliver { bytes: Vec<u8> },
	/// Close the destination file.
	CloseDestination,
	/// Terminal: the session is over, successfully or not.
	Done(Result<(), SessionError>),
}

/// Drives one client-side transfer. See the module docs for the event-driven design.
pub struct ClientSession {
	config: ClientConfig,
	server_addr: SocketAddr,
	state: State,
	attempts: u32,
	/// The port the server's reply first came from; once set, every
	/// subsequent control datagram is expected to originate from it — the
	/// client locks onto the first port that responds.
	locked_addr: Option<SocketAddr>,
	buffer: Option<ReceiverBuffer>,
	pending_eof: Option<u32>,
}

impl ClientSession {
	pub fn new(config: ClientConfig, server_addr: SocketAddr) -> Self {
		Self {
			config,
			server_addr,
			state: State::SendFilename,
			attempts: 0,
			locked_addr: None,
			buffer: None,
			pending_eof: None,
		}
	}

	/// Kick off the session: send the initial FILENAME PDU.
	pub fn start(&mut self) -> Vec<ClientAction> {
		self.send_filename()
	}

	fn effective_addr(&self) -> SocketAddr {
		self.locked_addr.unwrap_or(self.server_addr)
	}

	fn send_filename(&mut self) -> Vec<ClientAction> {
		let mut buf = [0u8; framing::MAX_PDU_LEN];
		let len = framing::encode_data(
			&mut buf,
			0,
			Flag::Filename,
			self.config.from_filename.as_bytes(),
			self.config.window_size,
			self.config.buffer_size,
		)
		.expect("filename PDU always fits and validates at ClientConfig construction");

		self.state = State::WaitForAck;
		trace!(attempt = self.attempts, "sending FILENAME");

		vec![
			ClientAction::Send { addr: self.effective_addr(), bytes: buf[..len].to_vec() },
			ClientAction::AwaitDatagram { timeout: FILENAME_TIMEOUT },
		]
	}

	/// Called when the driver's wait times out with no datagram.
	pub fn on_timeout(&mut self) -> Vec<ClientAction> {
		match self.state {
			State::WaitForAck => {
				self.attempts += 1;
				if self.attempts >= MAX_FILENAME_ATTEMPTS {
					warn!("server did not respond after {} attempts", self.attempts);
					self.state = State::Done;
					return vec![ClientAction::Done(Err(SessionError::PeerUnreachable))];
				}

				let mut actions = vec![ClientAction::Rebind];
				actions.extend(self.send_filename());
				actions
			}
			State::WaitForData => {
				debug!("no datagram for {DATA_IDLE_TIMEOUT:?}, declaring transfer complete");
				self.state = State::Done;
				vec![ClientAction::CloseDestination, ClientAction::Done(Ok(()))]
			}
			State::SendFilename | State::Done => Vec::new(),
		}
	}

	/// Called when the driver receives a datagram from `from`.
	pub fn on_datagram(&mut self, from: SocketAddr, bytes: &[u8]) -> Vec<ClientAction> {
		if !framing::verify(bytes) {
			trace!(pdu = %format_args!("{:x}", BytesFmt(bytes)), "checksum failed, dropping");
			return self.await_same();
		}

		let decoded = match framing::decode(bytes) {
			Ok(d) => d,
			Err(_) => {
				trace!(pdu = %format_args!("{:x}", BytesFmt(bytes)), "malformed PDU, dropping");
				return self.await_same();
			}
		};

		if let Some(locked) = self.locked_addr {
			if locked != from && self.state != State::WaitForAck {
				trace!(%from, %locked, "datagram from unexpected peer, dropping");
				return self.await_same();
			}
		}

		match self.state {
			State::WaitForAck => self.handle_ack(decoded, from),
			State::WaitForData => self.handle_data(decoded),
			State::SendFilename | State::Done => Vec::new(),
		}
	}

	fn await_same(&self) -> Vec<ClientAction> {
		let timeout = match self.state {
			State::WaitForAck => FILENAME_TIMEOUT,
			State::WaitForData => DATA_IDLE_TIMEOUT,
			State::SendFilename | State::Done => return Vec::new(),
		};
		vec![ClientAction::AwaitDatagram { timeout }]
	}

	fn handle_ack(&mut self, decoded: Decoded<'_>, from: SocketAddr) -> Vec<ClientAction> {
		match decoded {
			Decoded::FilenameNotOk { .. } => {
				warn!("server reported file not found");
				self.state = State::Done;
				vec![ClientAction::Done(Err(SessionError::FileNotFound))]
			}
			Decoded::FilenameOk { .. } => {
				self.locked_addr = Some(from);
				self.buffer = Some(ReceiverBuffer::new(self.config.window_size as u32));
				self.state = State::WaitForData;

				let mut buf = [0u8; framing::HEADER_LEN + framing::ACK_BODY_LEN];
				let len = framing::encode_control(&mut buf, 0, Flag::FileOkAck, None).expect("ack-style PDU always fits");

				vec![
					ClientAction::OpenDestination,
					ClientAction::Send { addr: from, bytes: buf[..len].to_vec() },
					ClientAction::AwaitDatagram { timeout: DATA_IDLE_TIMEOUT },
				]
			}
			_ => self.await_same(),
		}
	}

	fn handle_data(&mut self, decoded: Decoded<'_>) -> Vec<ClientAction> {
		let buffer = self.buffer.as_mut().expect("buffer is initialized once WaitForData begins");

		match decoded {
			Decoded::Eof { seq, .. } => {
				self.pending_eof = Some(seq);
				self.try_finish_on_eof()
			}
			Decoded::Data { seq, flag, payload, .. } => {
				trace!(seq, ?flag, len = payload.len(), "received data");
				let outcome = buffer.on_data(seq, payload);
				self.actions_for_outcome(outcome)
			}
			_ => self.await_same(),
		}
	}

	fn actions_for_outcome(&mut self, outcome: Outcome) -> Vec<ClientAction> {
		if let Outcome::Delivered { bytes } = &outcome {
			if self.pending_eof.is_some() {
				// Bytes already reached nextSeqNum's contiguous run; the
				// pending EOF only needs to re-check whether it is now in
				// order, not re-drain what on_data already drained.
				let mut actions = Vec::new();
				if !bytes.is_empty() {
					actions.push(ClientAction::Deliver { bytes: bytes.clone() });
				}
				actions.extend(self.try_finish_on_eof());
				return actions;
			}
		}

		let buffer = self.buffer.as_ref().expect("buffer is initialized once WaitForData begins");
		let mut actions = Vec::new();

		match outcome {
			Outcome::Delivered { bytes } => {
				if !bytes.is_empty() {
					actions.push(ClientAction::Deliver { bytes });
				}
				actions.extend(self.send_rr(buffer.next_seq_num()));
			}
			Outcome::Gap { next_seq_num } => {
				actions.extend(self.send_srej(next_seq_num));
				actions.extend(self.send_rr(next_seq_num));
			}
			Outcome::Duplicate { next_seq_num } => {
				actions.extend(self.send_rr(next_seq_num));
			}
		}

		actions.push(ClientAction::AwaitDatagram { timeout: DATA_IDLE_TIMEOUT });
		actions
	}

	/// Once an EOF has been seen, finish as soon as the buffer has caught up
	/// to it: send RR(eof_seq + 1) and transition to Done.
	fn try_finish_on_eof(&mut self) -> Vec<ClientAction> {
		let Some(eof_seq) = self.pending_eof else {
			return vec![ClientAction::AwaitDatagram { timeout: DATA_IDLE_TIMEOUT }];
		};

		let buffer = self.buffer.as_mut().expect("buffer is initialized once WaitForData begins");

		// Drain any run that became contiguous, in case the EOF arrived
		// before the last few data packets did.
		let mut actions = Vec::new();
		if let Outcome::Delivered { bytes } = buffer.drain() {
			if !bytes.is_empty() {
				actions.push(ClientAction::Deliver { bytes });
			}
		}

		if buffer.next_seq_num() == eof_seq {
			debug!(eof_seq, "EOF delivered in order, finishing");
			self.state = State::Done;
			let mut buf = [0u8; framing::HEADER_LEN + framing::SEQ_BODY_LEN];
			let len = framing::encode_control(&mut buf, 0, Flag::Rr, Some(eof_seq + 1)).expect("RR always fits");
			actions.push(ClientAction::Send { addr: self.effective_addr(), bytes: buf[..len].to_vec() });
			actions.push(ClientAction::CloseDestination);
			actions.push(ClientAction::Done(Ok(())));
		} else {
			actions.extend(self.send_srej(buffer.next_seq_num()));
			actions.extend(self.send_rr(buffer.next_seq_num()));
			actions.push(ClientAction::AwaitDatagram { timeout: DATA_IDLE_TIMEOUT });
		}

		actions
	}

	fn send_rr(&self, next_expected: u32) -> Vec<ClientAction> {
		let mut buf = [0u8; framing::HEADER_LEN + framing::SEQ_BODY_LEN];
		let len = framing::encode_control(&mut buf, 0, Flag::Rr, Some(next_expected)).expect("RR always fits");
		vec![ClientAction::Send { addr: self.effective_addr(), bytes: buf[..len].to_vec() }]
	}

	fn send_srej(&self, missing: u32) -> Vec<ClientAction> {
		let mut buf = [0u8; framing::HEADER_LEN + framing::SEQ_BODY_LEN];
		let len = framing::encode_control(&mut buf, 0, Flag::Srej, Some(missing)).expect("SREJ always fits");
		vec![ClientAction::Send { addr: self.effective_addr(), bytes: buf[..len].to_vec() }]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn addr(port: u16) -> SocketAddr {
		SocketAddr::from(([127, 0, 0, 1], port))
	}

	fn config() -> ClientConfig {
		ClientConfig::new("src.bin".into(), "dst.bin".into(), 4, 1000, 0.0, "localhost".into(), 9000).unwrap()
	}

	#[test]
	fn start_sends_filename_and_awaits() {
		let mut session = ClientSession::new(config(), addr(9000));
		let actions = session.start();
		assert!(matches!(actions[0], ClientAction::Send { .. }));
		assert!(matches!(actions[1], ClientAction::AwaitDatagram { .. }));
	}

	#[test]
	fn ten_bootstrap_timeouts_abort() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();
		for _ in 0..9 {
			let actions = session.on_timeout();
			assert!(actions.iter().any(|a| matches!(a, ClientAction::Rebind)));
		}
		let actions = session.on_timeout();
		assert!(matches!(actions.last(), Some(ClientAction::Done(Err(SessionError::PeerUnreachable)))));
	}

	#[test]
	fn filename_not_ok_aborts_with_file_not_found() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();

		let mut buf = [0u8; 8];
		let len = framing::encode_control(&mut buf, 1, Flag::FilenameNotOk, None).unwrap();
		let actions = session.on_datagram(addr(54321), &buf[..len]);
		assert!(matches!(actions.last(), Some(ClientAction::Done(Err(SessionError::FileNotFound)))));
	}

	#[test]
	fn filename_ok_locks_onto_responding_port_and_opens_destination() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();

		let mut buf = [0u8; 8];
		let len = framing::encode_control(&mut buf, 1, Flag::FilenameOk, None).unwrap();
		let actions = session.on_datagram(addr(54321), &buf[..len]);

		assert!(actions.contains(&ClientAction::OpenDestination));
		assert_eq!(session.locked_addr, Some(addr(54321)));
		assert!(matches!(actions.last(), Some(ClientAction::AwaitDatagram { .. })));
	}

	#[test]
	fn in_order_data_is_delivered_and_acked() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();
		let mut buf = [0u8; 8];
		let len = framing::encode_control(&mut buf, 1, Flag::FilenameOk, None).unwrap();
		session.on_datagram(addr(54321), &buf[..len]);

		let mut data = [0u8; framing::MAX_PDU_LEN];
		let len = framing::encode_data(&mut data, 0, Flag::Data, b"hello", 4, 1000).unwrap();
		let actions = session.on_datagram(addr(54321), &data[..len]);

		assert!(actions.iter().any(|a| matches!(a, ClientAction::Deliver { bytes } if bytes == b"hello")));
		assert!(actions.iter().any(|a| matches!(a, ClientAction::Send { bytes, .. } if bytes[6] == Flag::Rr as u8)));
	}

	#[test]
	fn out_of_order_data_triggers_srej_and_buffers() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();
		let mut buf = [0u8; 8];
		let len = framing::encode_control(&mut buf, 1, Flag::FilenameOk, None).unwrap();
		session.on_datagram(addr(54321), &buf[..len]);

		let mut data = [0u8; framing::MAX_PDU_LEN];
		let len = framing::encode_data(&mut data, 1, Flag::Data, b"second", 4, 1000).unwrap();
		let actions = session.on_datagram(addr(54321), &data[..len]);

		assert!(actions.iter().any(|a| matches!(a, ClientAction::Send { bytes, .. } if bytes[6] == Flag::Srej as u8)));
		assert!(!actions.iter().any(|a| matches!(a, ClientAction::Deliver { .. })));
	}

	#[test]
	fn corrupted_datagram_is_silently_dropped() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();
		let mut buf = [0u8; 8];
		let len = framing::encode_control(&mut buf, 1, Flag::FilenameOk, None).unwrap();
		buf[0] ^= 0xFF; // corrupt the sequence number, checksum no longer validates
		let actions = session.on_datagram(addr(54321), &buf[..len]);
		assert_eq!(actions, vec![ClientAction::AwaitDatagram { timeout: FILENAME_TIMEOUT }]);
	}

	#[test]
	fn eof_delivered_in_order_finishes_the_session() {
		let mut session = ClientSession::new(config(), addr(9000));
		session.start();
		let mut buf = [0u8; 8];
		let len = framing::encode_control(&mut buf, 1, Flag::FilenameOk, None).unwrap();
		session.on_datagram(addr(54321), &buf[..len]);

		let mut eof = [0u8; framing::MAX_PDU_LEN];
		let len = framing::encode_data(&mut eof, 0, Flag::Eof, &[], 4, 1000).unwrap();
		let actions = session.on_datagram(addr(54321), &eof[..len]);

		assert!(matches!(actions.last(), Some(ClientAction::Done(Ok(())))));
	}
}
