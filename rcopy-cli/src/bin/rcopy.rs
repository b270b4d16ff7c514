//! The `rcopy` client binary: drives a [`ClientSession`] to completion over
//! a real UDP socket, performing the file I/O the protocol core leaves
//! external.

use std::fs::File;
use std::io::Write;
use std::net::ToSocketAddrs;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use rcopy_cli::cli::ClientArgs;
use rcopy_cli::net::UdpChannel;
use rcopy_harness::{ChannelError, Seed};
use rcopy_proto::channel::DatagramChannel;
use rcopy_proto::error::SessionError;
use rcopy_proto::framing::MAX_PDU_LEN;
use rcopy_proto::session::client::{ClientAction, ClientSession};
use rcopy_proto::session::config::ClientConfig;

fn main() -> ExitCode {
	rcopy_cli::logging::init();
	let args = ClientArgs::parse();

	let config = match ClientConfig::new(
		args.from_filename,
		args.to_filename,
		args.window_size,
		args.buffer_size,
		args.error_rate,
		args.remote_host,
		args.remote_port,
	) {
		Ok(c) => c,
		Err(e) => {
			error!("invalid configuration: {e}");
			return ExitCode::FAILURE;
		}
	};

	let server_addr = match (config.remote_host.as_str(), config.remote_port).to_socket_addrs().and_then(|mut i| {
		i.next().ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses for host"))
	}) {
		Ok(addr) => addr,
		Err(e) => {
			error!("could not resolve {}:{}: {e}", config.remote_host, config.remote_port);
			return ExitCode::FAILURE;
		}
	};

	let channel = match UdpChannel::bind_ephemeral() {
		Ok(c) => c.with_error_injection(ChannelError::new(
			config.error_rate,
			args.drop_enabled,
			args.flip_enabled,
			Seed::FromEntropy,
		)),
		Err(e) => {
			error!("could not bind a local socket: {e}");
			return ExitCode::FAILURE;
		}
	};

	let to_filename = config.to_filename.clone();
	let mut session = ClientSession::new(config, server_addr);

	match run(&mut session, channel, &to_filename) {
		Ok(()) => {
			info!("transfer complete");
			ExitCode::SUCCESS
		}
		Err(e) => {
			error!("transfer failed: {e}");
			ExitCode::FAILURE
		}
	}
}

fn run(session: &mut ClientSession, mut channel: UdpChannel, to_filename: &str) -> Result<(), SessionError> {
	let mut dest: Option<File> = None;
	let mut actions = session.start();

	loop {
		let mut next = Vec::new();

		for action in actions {
			match action {
				ClientAction::Send { addr, bytes } => channel.send_to(&bytes, addr)?,
				ClientAction::AwaitDatagram { timeout } => {
					let mut buf = [0u8; MAX_PDU_LEN];
					match channel.recv_from(&mut buf, timeout)? {
						Some((n, from)) => next.extend(session.on_datagram(from, &buf[..n])),
						None => next.extend(session.on_timeout()),
					}
				}
				ClientAction::Rebind => channel.rebind()?,
				ClientAction::OpenDestination => {
					dest = Some(File::create(to_filename)?);
				}
				ClientAction::Deliver { bytes } => {
					dest.as_mut().expect("destination is opened before the first DATA packet").write_all(&bytes)?;
				}
				ClientAction::CloseDestination => {
					if let Some(mut f) = dest.take() {
						f.flush()?;
					}
				}
				ClientAction::Done(result) => return result,
			}
		}

		actions = next;
	}
}
