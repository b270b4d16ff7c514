//! Typed errors for configuration validation and session failure.

use std::io;
use thiserror::Error;

use crate::framing::{MAX_BUFFER_SIZE, MAX_FILENAME_LEN, MIN_BUFFER_SIZE};

/// Rejected client or server configuration. All of these are caught at
/// construction time, replacing the original `parseArgs`'s `exit(-1)` calls.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
	#[error("filename is {len} bytes, must be at most {MAX_FILENAME_LEN}")]
	FilenameTooLong { len: usize },
	#[error("buffer size {got} out of range [{MIN_BUFFER_SIZE}, {MAX_BUFFER_SIZE}]")]
	BufferSizeOutOfRange { got: u16 },
	#[error("error rate {0} out of range [0, 1)")]
	ErrorRateOutOfRange(f64),
	#[error("window size {0} does not fit in a single byte (max 255)")]
	WindowSizeTooLarge(u32),
	#[error("window size must be at least 1")]
	WindowSizeZero,
}

/// A fatal session outcome. Transient channel errors (drop, corruption,
/// reorder) never reach this type — they are absorbed by the window/buffer
/// transition tables.
#[derive(Debug, Error)]
pub enum SessionError {
	#[error("peer unreachable: no response after repeated attempts")]
	PeerUnreachable,
	#[error("file not found on server")]
	FileNotFound,
	#[error("failed to open local file: {0}")]
	LocalIo(#[from] io::Error),
}

/// `io::Error` carries no `PartialEq` of its own; comparing its `ErrorKind`
/// is enough for the equality assertions this type is used in (tests only).
impl PartialEq for SessionError {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::PeerUnreachable, Self::PeerUnreachable) => true,
			(Self::FileNotFound, Self::FileNotFound) => true,
			(Self::LocalIo(a), Self::LocalIo(b)) => a.kind() == b.kind(),
			_ => false,
		}
	}
}
