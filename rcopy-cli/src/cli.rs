//! Command-line surfaces for the client and server binaries.

use clap::Parser;

/// Request a file from an `rcopy-server` and reassemble it locally.
#[derive(Debug, Parser)]
#[command(name = "rcopy", about = "Reliable file transfer over UDP", version)]
pub struct ClientArgs {
	/// Name of the file to request from the server.
	pub from_filename: String,
	/// Name to write the received file to, locally.
	pub to_filename: String,
	/// Sender window size, in packets (must fit in a byte, at least 1).
	pub window_size: u32,
	/// Negotiated payload buffer size, in bytes (400-1400 inclusive).
	pub buffer_size: u16,
	/// Per-datagram error rate injected by the local harness, in [0, 1).
	pub error_rate: f64,
	/// Hostname or address of the `rcopy-server` to contact.
	pub remote_host: String,
	/// Well-known port the server is listening on.
	pub remote_port: u16,
	/// Let the harness drop outgoing datagrams at `error_rate`.
	#[arg(long, default_value_t = false)]
	pub drop_enabled: bool,
	/// Let the harness corrupt outgoing datagrams at `error_rate`.
	#[arg(long, default_value_t = false)]
	pub flip_enabled: bool,
}

/// Serve files to `rcopy` clients, one thread per accepted transfer.
#[derive(Debug, Parser)]
#[command(name = "rcopy-server", about = "rcopy file server", version)]
pub struct ServerArgs {
	/// Per-datagram error rate injected by the local harness, in [0, 1).
	pub error_rate: f64,
	/// Port to listen on; 0 lets the OS choose one (printed at startup).
	#[arg(default_value_t = 0)]
	pub port: u16,
	/// Let the harness drop outgoing datagrams at `error_rate`.
	#[arg(long, default_value_t = true)]
	pub drop_enabled: bool,
	/// Let the harness corrupt outgoing datagrams at `error_rate`.
	#[arg(long, default_value_t = true)]
	pub flip_enabled: bool,
}
