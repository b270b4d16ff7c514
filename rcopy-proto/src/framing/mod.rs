//! PDU framing: byte layout, checksum, and encode/decode.
//!
//! All multibyte integers are carried in network byte order. A PDU's header
//! is `seq(4) | checksum(2) | flag(1)`, followed by a flag-specific body.
//! See [`Flag`] for the wire values and the module-level docs in `rcopy-proto`
//! for the full layout table.

pub mod checksum;
mod flag;

pub use flag::Flag;

use byteorder::{ByteOrder, BigEndian as BE};
use thiserror::Error;

/// Length of the fixed header: sequence (4) + checksum (2) + flag (1).
pub const HEADER_LEN: usize = 7;
/// Length of an ack-style body (`FILENAME_OK`, `FILE_OK_ACK`, `FILENAME_NOT_OK`, `EOF_ACK`): one pad byte.
pub const ACK_BODY_LEN: usize = 1;
/// Length of an `RR`/`SREJ` body: a single 4-byte subject sequence.
pub const SEQ_BODY_LEN: usize = 4;
/// Length of the `(window, buf_size)` sub-header prefixing `FILENAME`/`EOF`/`DATA` bodies.
pub const DATA_SUBHEADER_LEN: usize = 3;

/// Lower bound on the negotiated buffer size, inclusive.
pub const MIN_BUFFER_SIZE: u16 = 400;
/// Upper bound on the negotiated buffer size, inclusive.
pub const MAX_BUFFER_SIZE: u16 = 1400;
/// Upper bound on a filename's length, in bytes.
pub const MAX_FILENAME_LEN: usize = 100;

/// An upper bound on the encoded length of any PDU this protocol defines,
/// sized for a `MAX_BUFFER_SIZE`-byte DATA payload.
pub const MAX_PDU_LEN: usize = HEADER_LEN + DATA_SUBHEADER_LEN + MAX_BUFFER_SIZE as usize;

/// Failure to encode or decode a PDU.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
	#[error("PDU shorter than the minimum header length")]
	TooShort,
	#[error("PDU body length does not match its flag")]
	Malformed,
	#[error("unrecognized flag byte {0}")]
	UnknownFlag(u8),
	#[error("payload of {len} bytes does not fit in a buffer of size {buf_size}")]
	PayloadTooLarge { len: usize, buf_size: u16 },
	#[error("encode buffer of {have} bytes is too small, need {need}")]
	BufferTooSmall { have: usize, need: usize },
}

/// A decoded PDU, borrowing its variable-length tail (filename or payload)
/// from the buffer it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<'a> {
	/// Cumulative acknowledgement: the receiver's `nextSeqNum`.
	Rr { seq: u32, next_expected: u32 },
	/// Selective reject: the single sequence the receiver is missing.
	Srej { seq: u32, missing: u32 },
	/// The client's request to transfer a file, with negotiated sizes.
	Filename { seq: u32, window: u8, buf_size: u16, filename: &'a [u8] },
	/// The server accepted the requested filename.
	FilenameOk { seq: u32 },
	/// The server could not serve the requested filename.
	FilenameNotOk { seq: u32 },
	/// The client confirms its output file is open and ready for data.
	FileOkAck { seq: u32 },
	/// End-of-file marker; carries no payload.
	Eof { seq: u32, window: u8, buf_size: u16 },
	/// Reserved acknowledgement of the EOF handshake.
	EofAck { seq: u32 },
	/// A chunk of file data. `flag` distinguishes DATA/DATA-RESENT/DATA-TIMEOUT-RESEND
	/// for tracing only — receivers must treat all three identically.
	Data { seq: u32, flag: Flag, window: u8, buf_size: u16, payload: &'a [u8] },
}

impl Decoded<'_> {
	/// The header sequence number (data sequence for DATA/EOF/FILENAME PDUs,
	/// the separate monotonic ack-sequence for RR/SREJ/ack-style PDUs).
	pub fn seq(&self) -> u32 {
		match *self {
			Self::Rr { seq, .. }
			| Self::Srej { seq, .. }
			| Self::Filename { seq, .. }
			| Self::FilenameOk { seq }
			| Self::FilenameNotOk { seq }
			| Self::FileOkAck { seq }
			| Self::Eof { seq, .. }
			| Self::EofAck { seq }
			| Self::Data { seq, .. } => seq,
		}
	}
}

/// Encode a `DATA`/`DATA-RESENT`/`DATA-TIMEOUT-RESEND`/`FILENAME`/`EOF` PDU
/// (the flags whose body starts with the `(window, buf_size)` sub-header)
/// into `buf`, returning the number of bytes written.
pub fn encode_data(buf: &mut [u8], seq: u32, flag: Flag, payload: &[u8], window: u8, buf_size: u16) -> Result<usize, FramingError> {
	let total = HEADER_LEN + DATA_SUBHEADER_LEN + payload.len();

	if payload.len() > buf_size as usize {
		return Err(FramingError::PayloadTooLarge { len: payload.len(), buf_size });
	}
	if buf.len() < total {
		return Err(FramingError::BufferTooSmall { have: buf.len(), need: total });
	}

	write_header(buf, seq, flag, 0);
	buf[HEADER_LEN] = window;
	BE::write_u16(&mut buf[HEADER_LEN + 1..], buf_size);
	buf[HEADER_LEN + DATA_SUBHEADER_LEN..total].copy_from_slice(payload);

	finalize_checksum(&mut buf[..total]);

	Ok(total)
}

/// Encode a control PDU: `RR`/`SREJ` (carrying `subject`) or one of the
/// ack-style single-pad-byte PDUs (`FILENAME_OK`, `FILE_OK_ACK`,
/// `FILENAME_NOT_OK`, `EOF_ACK`, when `subject` is `None`).
pub fn encode_control(buf: &mut [u8], seq: u32, flag: Flag, subject: Option<u32>) -> Result<usize, FramingError> {
	let body_len = if subject.is_some() { SEQ_BODY_LEN } else { ACK_BODY_LEN };
	let total = HEADER_LEN + body_len;

	if buf.len() < total {
		return Err(FramingError::BufferTooSmall { have: buf.len(), need: total });
	}

	write_header(buf, seq, flag, 0);

	match subject {
		Some(subject) => BE::write_u32(&mut buf[HEADER_LEN..], subject),
		None => buf[HEADER_LEN] = 0,
	}

	finalize_checksum(&mut buf[..total]);

	Ok(total)
}

/// Verify a received PDU's checksum. A PDU that fails this check must be
/// silently dropped — no negative acknowledgement is ever sent.
pub fn verify(bytes: &[u8]) -> bool {
	bytes.len() >= HEADER_LEN && checksum::verify(bytes)
}

/// Decode a received, checksum-verified PDU.
///
/// Callers are expected to call [`verify`] first; `decode` does not
/// recompute the checksum, it only parses the already-validated bytes.
pub fn decode(bytes: &[u8]) -> Result<Decoded<'_>, FramingError> {
	if bytes.len() < HEADER_LEN {
		return Err(FramingError::TooShort);
	}

	let seq = BE::read_u32(&bytes[0..4]);
	let flag_byte = bytes[6];
	let flag = Flag::from_byte(flag_byte).ok_or(FramingError::UnknownFlag(flag_byte))?;
	let body = &bytes[HEADER_LEN..];

	Ok(match flag {
		Flag::Rr => Decoded::Rr { seq, next_expected: read_seq_body(body)? },
		Flag::Srej => Decoded::Srej { seq, missing: read_seq_body(body)? },
		Flag::FilenameOk => Decoded::FilenameOk { seq },
		Flag::FilenameNotOk => Decoded::FilenameNotOk { seq },
		Flag::FileOkAck => Decoded::FileOkAck { seq },
		Flag::EofAck => Decoded::EofAck { seq },
		Flag::Filename => {
			let (window, buf_size) = read_data_subheader(body)?;
			Decoded::Filename { seq, window, buf_size, filename: &body[DATA_SUBHEADER_LEN..] }
		}
		Flag::Eof => {
			let (window, buf_size) = read_data_subheader(body)?;
			Decoded::Eof { seq, window, buf_size }
		}
		Flag::Data | Flag::DataResent | Flag::DataTimeoutResend => {
			let (window, buf_size) = read_data_subheader(body)?;
			Decoded::Data { seq, flag, window, buf_size, payload: &body[DATA_SUBHEADER_LEN..] }
		}
	})
}

fn read_seq_body(body: &[u8]) -> Result<u32, FramingError> {
	if body.len() < SEQ_BODY_LEN {
		return Err(FramingError::Malformed);
	}
	Ok(BE::read_u32(body))
}

fn read_data_subheader(body: &[u8]) -> Result<(u8, u16), FramingError> {
	if body.len() < DATA_SUBHEADER_LEN {
		return Err(FramingError::Malformed);
	}
	Ok((body[0], BE::read_u16(&body[1..3])))
}

fn write_header(buf: &mut [u8], seq: u32, flag: Flag, checksum: u16) {
	BE::write_u32(&mut buf[0..4], seq);
	BE::write_u16(&mut buf[4..6], checksum);
	buf[6] = flag.into();
}

fn finalize_checksum(pdu: &mut [u8]) {
	let csum = checksum::compute(pdu);
	pdu[4..6].copy_from_slice(&csum);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn data_round_trip() {
		let mut buf = [0u8; MAX_PDU_LEN];
		let payload = b"hello, world";
		let len = encode_data(&mut buf, 42, Flag::Data, payload, 4, 1000).unwrap();

		assert!(verify(&buf[..len]));
		match decode(&buf[..len]).unwrap() {
			Decoded::Data { seq, flag, window, buf_size, payload: got } => {
				assert_eq!(seq, 42);
				assert_eq!(flag, Flag::Data);
				assert_eq!(window, 4);
				assert_eq!(buf_size, 1000);
				assert_eq!(got, payload);
			}
			other => panic!("unexpected decode: {other:?}"),
		}
	}

	#[test]
	fn rr_round_trip() {
		let mut buf = [0u8; HEADER_LEN + SEQ_BODY_LEN];
		let len = encode_control(&mut buf, 7, Flag::Rr, Some(5)).unwrap();
		assert_eq!(len, 11);
		assert!(verify(&buf[..len]));
		assert_eq!(decode(&buf[..len]).unwrap(), Decoded::Rr { seq: 7, next_expected: 5 });
	}

	#[test]
	fn srej_round_trip() {
		let mut buf = [0u8; HEADER_LEN + SEQ_BODY_LEN];
		let len = encode_control(&mut buf, 1, Flag::Srej, Some(3)).unwrap();
		assert_eq!(decode(&buf[..len]).unwrap(), Decoded::Srej { seq: 1, missing: 3 });
	}

	#[test]
	fn ack_style_pdus_are_eight_bytes() {
		let mut buf = [0u8; HEADER_LEN + ACK_BODY_LEN];
		for flag in [Flag::FilenameOk, Flag::FileOkAck, Flag::FilenameNotOk, Flag::EofAck] {
			let len = encode_control(&mut buf, 0, flag, None).unwrap();
			assert_eq!(len, 8);
			assert!(verify(&buf[..len]));
		}
	}

	#[test]
	fn filename_round_trip() {
		let mut buf = [0u8; MAX_PDU_LEN];
		let len = encode_data(&mut buf, 0, Flag::Filename, b"report.csv", 8, 1024).unwrap();
		match decode(&buf[..len]).unwrap() {
			Decoded::Filename { window, buf_size, filename, .. } => {
				assert_eq!(window, 8);
				assert_eq!(buf_size, 1024);
				assert_eq!(filename, b"report.csv");
			}
			other => panic!("unexpected decode: {other:?}"),
		}
	}

	#[test]
	fn eof_round_trip() {
		let mut buf = [0u8; MAX_PDU_LEN];
		let len = encode_data(&mut buf, 99, Flag::Eof, &[], 4, 512).unwrap();
		assert_eq!(decode(&buf[..len]).unwrap(), Decoded::Eof { seq: 99, window: 4, buf_size: 512 });
	}

	#[test]
	fn bit_flip_fails_verification() {
		let mut buf = [0u8; MAX_PDU_LEN];
		let len = encode_data(&mut buf, 1, Flag::Data, b"payload", 4, 1000).unwrap();
		assert!(verify(&buf[..len]));
		buf[HEADER_LEN + DATA_SUBHEADER_LEN] ^= 0x01;
		assert!(!verify(&buf[..len]));
	}

	#[test]
	fn too_short_is_malformed() {
		assert_eq!(decode(&[0u8; 3]), Err(FramingError::TooShort));
	}

	#[test]
	fn unknown_flag_is_rejected() {
		let mut buf = [0u8; HEADER_LEN];
		buf[6] = 250;
		assert_eq!(decode(&buf), Err(FramingError::UnknownFlag(250)));
	}

	#[test]
	fn payload_larger_than_buffer_size_rejected() {
		let mut buf = [0u8; MAX_PDU_LEN];
		let err = encode_data(&mut buf, 0, Flag::Data, b"too much", 4, 4).unwrap_err();
		assert_eq!(err, FramingError::PayloadTooLarge { len: 8, buf_size: 4 });
	}
}
