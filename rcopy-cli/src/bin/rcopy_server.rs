//! The `rcopy-server` binary: listens on a well-known port for FILENAME
//! requests and spawns one thread per accepted transfer, each bound to its
//! own ephemeral port.

use std::fs::File;
use std::io::Read;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::thread::JoinHandle;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use rcopy_cli::cli::ServerArgs;
use rcopy_cli::net::UdpChannel;
use rcopy_harness::{ChannelError, Seed};
use rcopy_proto::channel::DatagramChannel;
use rcopy_proto::framing::{self, Decoded, Flag, MAX_PDU_LEN};
use rcopy_proto::session::config::ServerConfig;
use rcopy_proto::session::server::{ServerAction, ServerSession};

/// How long the listener blocks between reaping finished session threads.
const LISTEN_POLL: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
	rcopy_cli::logging::init();
	let args = ServerArgs::parse();

	let config = match ServerConfig::new(args.error_rate, args.port) {
		Ok(c) => c,
		Err(e) => {
			error!("invalid configuration: {e}");
			return ExitCode::FAILURE;
		}
	};

	let mut channel = match UdpChannel::bind(SocketAddr::from(([0, 0, 0, 0], config.port))) {
		Ok(c) => c,
		Err(e) => {
			error!("could not bind port {}: {e}", config.port);
			return ExitCode::FAILURE;
		}
	};

	match channel.local_addr() {
		Ok(addr) => info!("listening on {addr}"),
		Err(e) => warn!("bound, but could not determine local address: {e}"),
	}

	let mut sessions: Vec<JoinHandle<()>> = Vec::new();
	let mut buf = [0u8; MAX_PDU_LEN];

	loop {
		sessions.retain(|h| !h.is_finished());

		match channel.recv_from(&mut buf, LISTEN_POLL) {
			Ok(Some((n, from))) => {
				if let Some(handle) =
					handle_datagram(&mut channel, &buf[..n], from, config.error_rate, args.drop_enabled, args.flip_enabled)
				{
					sessions.push(handle);
				}
			}
			Ok(None) => {}
			Err(e) => warn!("error receiving on the listening socket: {e}"),
		}
	}
}

/// Handle one datagram on the well-known port. Only `FILENAME` PDUs start a
/// session; everything else (including stray retransmissions from a session
/// whose reply raced this poll) is ignored here.
fn handle_datagram(
	listener: &mut UdpChannel,
	bytes: &[u8],
	from: SocketAddr,
	error_rate: f64,
	drop_enabled: bool,
	flip_enabled: bool,
) -> Option<JoinHandle<()>> {
	if !framing::verify(bytes) {
		return None;
	}
	let Ok(Decoded::Filename { window, buf_size, filename, .. }) = framing::decode(bytes) else {
		return None;
	};

	if window == 0 || !(framing::MIN_BUFFER_SIZE..=framing::MAX_BUFFER_SIZE).contains(&buf_size) {
		warn!(%from, window, buf_size, "negotiated sizes out of range, rejecting");
		reject(listener, from);
		return None;
	}

	let Ok(name) = std::str::from_utf8(filename) else {
		warn!(%from, "filename is not valid UTF-8, rejecting");
		reject(listener, from);
		return None;
	};

	match File::open(name) {
		Ok(source) => {
			info!(%from, file = name, window, buf_size, "accepted transfer");
			Some(std::thread::spawn(move || {
				run_session(source, from, window, buf_size, error_rate, drop_enabled, flip_enabled)
			}))
		}
		Err(e) => {
			warn!(%from, file = name, "rejecting request: {e}");
			reject(listener, from);
			None
		}
	}
}

fn reject(listener: &mut UdpChannel, from: SocketAddr) {
	let mut buf = [0u8; framing::HEADER_LEN + framing::ACK_BODY_LEN];
	if let Ok(len) = framing::encode_control(&mut buf, 0, Flag::FilenameNotOk, None) {
		let _ = listener.send_to(&buf[..len], from);
	}
}

fn run_session(
	mut source: File,
	peer: SocketAddr,
	window: u8,
	buf_size: u16,
	error_rate: f64,
	drop_enabled: bool,
	flip_enabled: bool,
) {
	let mut channel = match UdpChannel::bind_ephemeral() {
		Ok(c) => c.with_error_injection(ChannelError::new(error_rate, drop_enabled, flip_enabled, Seed::FromEntropy)),
		Err(e) => {
			error!(%peer, "could not bind a session socket: {e}");
			return;
		}
	};

	let mut session = ServerSession::new(peer, window, buf_size);
	let mut actions = session.start();

	loop {
		let mut next = Vec::new();

		for action in actions {
			match action {
				ServerAction::Send { addr, bytes } => {
					if let Err(e) = channel.send_to(&bytes, addr) {
						warn!(%peer, "send failed: {e}");
					}
				}
				ServerAction::AwaitDatagram { timeout } => {
					let mut buf = [0u8; MAX_PDU_LEN];
					match channel.recv_from(&mut buf, timeout) {
						Ok(Some((n, from))) => next.extend(session.on_datagram(from, &buf[..n])),
						Ok(None) => next.extend(session.on_timeout()),
						Err(e) => {
							warn!(%peer, "recv failed: {e}");
							next.extend(session.on_timeout());
						}
					}
				}
				ServerAction::ReadChunk { max_len } => {
					let mut chunk = vec![0u8; max_len];
					match source.read(&mut chunk) {
						Ok(n) => next.extend(session.on_chunk(&chunk[..n])),
						Err(e) => {
							error!(%peer, "failed to read source file: {e}");
							return;
						}
					}
				}
				// The source file is closed implicitly when this function returns.
				ServerAction::CloseSource => {}
				ServerAction::Done(Ok(())) => {
					info!(%peer, "transfer complete");
					return;
				}
				ServerAction::Done(Err(e)) => {
					warn!(%peer, "transfer failed: {e}");
					return;
				}
			}
		}

		actions = next;
	}
}
