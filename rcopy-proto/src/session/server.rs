//! The server-side send state machine.
//!
//! A [`ServerSession`] is created only after the listener has already opened
//! the requested file for reading and negotiated `window`/`buf_size` from the
//! client's FILENAME PDU, as its own per-session thread. The EOF marker is
//! not a separate handshake bolted onto the end of the transfer: it occupies
//! a window slot exactly like a DATA packet (same sub-header, same RR/SREJ
//! machinery), so the sliding window alone is what decides when the session
//! is done.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::SessionError;
use crate::framing::{self, Decoded, Flag};
use crate::util::BytesFmt;
use crate::window::SenderWindow;

const ACK_TIMEOUT: Duration = Duration::from_millis(1000);
const SEND_TIMEOUT: Duration = Duration::from_millis(1000);
const MAX_ACK_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	WaitOnAck,
	SendData,
	Done,
}

/// Whether the EOF marker has been handed to us by the driver, and if so
/// whether it has already been placed in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EofState {
	NotYetReached,
	PendingPlacement,
	Placed { seq: u32 },
}

#[derive(Debug, PartialEq)]
pub enum ServerAction {
	Send { addr: SocketAddr, bytes: Vec<u8> },
	AwaitDatagram { timeout: Duration },
	/// Read up to `max_len` bytes from the source file. The driver calls
	/// [`ServerSession::on_chunk`] with the result; an empty slice means EOF.
	ReadChunk { max_len: usize },
	CloseSource,
	Done(Result<(), SessionError>),
}

pub struct ServerSession {
	peer: SocketAddr,
	window: SenderWindow,
	buf_size: u16,
	window_size: u8,
	state: State,
	eof: EofState,
	ack_attempts: u32,
}

impl ServerSession {
	pub fn new(peer: SocketAddr, window_size: u8, buf_size: u16) -> Self {
		Self {
			peer,
			window: SenderWindow::new(window_size),
			buf_size,
			window_size,
			state: State::WaitOnAck,
			eof: EofState::NotYetReached,
			ack_attempts: 0,
		}
	}

	pub fn start(&mut self) -> Vec<ServerAction> {
		self.send_filename_ok()
	}

	fn send_filename_ok(&mut self) -> Vec<ServerAction> {
		let mut buf = [0u8; framing::HEADER_LEN + framing::ACK_BODY_LEN];
		let len = framing::encode_control(&mut buf, 0, Flag::FilenameOk, None).expect("ack-style PDU always fits");
		vec![
			ServerAction::Send { addr: self.peer, bytes: buf[..len].to_vec() },
			ServerAction::AwaitDatagram { timeout: ACK_TIMEOUT },
		]
	}

	pub fn on_timeout(&mut self) -> Vec<ServerAction> {
		match self.state {
			State::WaitOnAck => {
				self.ack_attempts += 1;
				if self.ack_attempts >= MAX_ACK_ATTEMPTS {
					warn!("client never confirmed the destination file, giving up");
					self.state = State::Done;
					return vec![ServerAction::CloseSource, ServerAction::Done(Err(SessionError::PeerUnreachable))];
				}
				self.send_filename_ok()
			}
			State::SendData => {
				let Some(oldest) = self.window.oldest() else {
					return vec![ServerAction::AwaitDatagram { timeout: SEND_TIMEOUT }];
				};
				let seq = oldest.seq;
				let flag = oldest.flag;
				let payload = oldest.payload.clone();

				if self.window.record_timeout() {
					warn!("no acknowledgement for 10 consecutive timeouts, giving up");
					self.state = State::Done;
					return vec![ServerAction::CloseSource, ServerAction::Done(Err(SessionError::PeerUnreachable))];
				}

				let resend_flag = if flag == Flag::Eof { Flag::Eof } else { Flag::DataTimeoutResend };
				debug!(seq, ?resend_flag, "retransmitting after timeout");
				vec![self.send_data(seq, resend_flag, &payload), self.await_send()]
					.into_iter()
					.flatten()
					.collect()
			}
			State::Done => Vec::new(),
		}
	}

	pub fn on_datagram(&mut self, from: SocketAddr, bytes: &[u8]) -> Vec<ServerAction> {
		if from != self.peer {
			trace!(%from, peer = %self.peer, "datagram from unexpected peer, dropping");
			return self.await_same();
		}
		if !framing::verify(bytes) {
			trace!(pdu = %format_args!("{:x}", BytesFmt(bytes)), "checksum failed, dropping");
			return self.await_same();
		}
		let decoded = match framing::decode(bytes) {
			Ok(d) => d,
			Err(_) => return self.await_same(),
		};

		match self.state {
			State::WaitOnAck => self.handle_ack(decoded),
			State::SendData => self.handle_control(decoded),
			State::Done => Vec::new(),
		}
	}

	fn handle_ack(&mut self, decoded: Decoded<'_>) -> Vec<ServerAction> {
		match decoded {
			Decoded::FileOkAck { .. } => {
				self.state = State::SendData;
				if self.window.is_open() {
					vec![ServerAction::ReadChunk { max_len: self.buf_size as usize }]
				} else {
					self.await_same()
				}
			}
			_ => self.await_same(),
		}
	}

	/// Called by the driver after a [`ServerAction::ReadChunk`] completes.
	/// `bytes` empty means the source file is exhausted.
	pub fn on_chunk(&mut self, bytes: &[u8]) -> Vec<ServerAction> {
		if bytes.is_empty() {
			return self.place_eof();
		}

		let seq = self.window.current();
		self.window.record(seq, Flag::Data, bytes);
		let mut actions = self.send_data(seq, Flag::Data, bytes);

		if self.window.is_open() {
			actions.push(ServerAction::ReadChunk { max_len: self.buf_size as usize });
		} else {
			actions.push(ServerAction::AwaitDatagram { timeout: SEND_TIMEOUT });
		}
		actions
	}

	fn place_eof(&mut self) -> Vec<ServerAction> {
		if !self.window.is_open() {
			self.eof = EofState::PendingPlacement;
			return vec![ServerAction::AwaitDatagram { timeout: SEND_TIMEOUT }];
		}

		let seq = self.window.current();
		self.window.record(seq, Flag::Eof, &[]);
		self.eof = EofState::Placed { seq };
		debug!(seq, "EOF placed in the sender window");
		vec![self.send_data(seq, Flag::Eof, &[]), self.await_send()]
			.into_iter()
			.flatten()
			.collect()
	}

	fn handle_control(&mut self, decoded: Decoded<'_>) -> Vec<ServerAction> {
		match decoded {
			Decoded::Rr { next_expected, .. } => {
				self.window.on_rr(next_expected);

				if let EofState::Placed { seq } = self.eof {
					if self.window.lower() > seq {
						debug!("final RR observed past the EOF sequence, session complete");
						self.state = State::Done;
						return vec![ServerAction::CloseSource, ServerAction::Done(Ok(()))];
					}
				}

				if self.eof == EofState::PendingPlacement && self.window.is_open() {
					return self.place_eof();
				}

				if self.eof == EofState::NotYetReached && self.window.is_open() {
					return vec![ServerAction::ReadChunk { max_len: self.buf_size as usize }];
				}

				self.await_same()
			}
			Decoded::Srej { missing, .. } => {
				let Some(slot) = self.window.on_srej(missing) else {
					trace!(missing, "SREJ for a sequence we no longer hold, ignoring");
					return self.await_same();
				};
				let flag = slot.flag;
				let payload = slot.payload.clone();
				let resend_flag = if flag == Flag::Eof { Flag::Eof } else { Flag::DataResent };
				debug!(seq = missing, ?resend_flag, "retransmitting after SREJ");
				vec![self.send_data(missing, resend_flag, &payload), self.await_send()]
					.into_iter()
					.flatten()
					.collect()
			}
			_ => self.await_same(),
		}
	}

	fn send_data(&self, seq: u32, flag: Flag, payload: &[u8]) -> Vec<ServerAction> {
		let mut buf = vec![0u8; framing::HEADER_LEN + framing::DATA_SUBHEADER_LEN + payload.len()];
		let len = framing::encode_data(&mut buf, seq, flag, payload, self.window_size, self.buf_size)
			.expect("payload never exceeds the negotiated buffer size once read in buf_size chunks");
		vec![ServerAction::Send { addr: self.peer, bytes: buf[..len].to_vec() }]
	}

	fn await_send(&self) -> Vec<ServerAction> {
		vec![ServerAction::AwaitDatagram { timeout: SEND_TIMEOUT }]
	}

	fn await_same(&self) -> Vec<ServerAction> {
		let timeout = match self.state {
			State::WaitOnAck => ACK_TIMEOUT,
			State::SendData => SEND_TIMEOUT,
			State::Done => return Vec::new(),
		};
		vec![ServerAction::AwaitDatagram { timeout }]
	}
}
