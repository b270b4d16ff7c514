//! The wire-visible PDU flag taxonomy.

/// Identifies the layout of a PDU's body. Values are fixed by the wire
/// protocol and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Flag {
	/// Cumulative acknowledgement; body carries the next-expected sequence.
	Rr = 5,
	/// Selective reject; body carries the single missing sequence.
	Srej = 6,
	/// Filename request; body carries window size, buffer size, filename.
	Filename = 8,
	/// Filename accepted; body is a single pad byte.
	FilenameOk = 9,
	/// End of file marker; body carries window size, buffer size.
	Eof = 10,
	/// File data.
	Data = 16,
	/// File data, reactively resent in response to an SREJ.
	DataResent = 17,
	/// File data, resent after a retransmission timeout.
	DataTimeoutResend = 18,
	/// Client's acknowledgement that the output file was opened.
	FileOkAck = 36,
	/// Filename rejected; body is a single pad byte.
	FilenameNotOk = 37,
	/// Reserved acknowledgement of the EOF handshake.
	EofAck = 38,
}

impl Flag {
	/// Recover a [`Flag`] from its wire byte, if it names a known variant.
	pub fn from_byte(byte: u8) -> Option<Self> {
		Some(match byte {
			5 => Self::Rr,
			6 => Self::Srej,
			8 => Self::Filename,
			9 => Self::FilenameOk,
			10 => Self::Eof,
			16 => Self::Data,
			17 => Self::DataResent,
			18 => Self::DataTimeoutResend,
			36 => Self::FileOkAck,
			37 => Self::FilenameNotOk,
			38 => Self::EofAck,
			_ => return None,
		})
	}

	/// True for the three data-carrying variants. The receiver treats all
	/// three identically; the distinction only exists for tracing which path
	/// produced a given transmission.
	pub fn is_data(self) -> bool {
		matches!(self, Self::Data | Self::DataResent | Self::DataTimeoutResend)
	}
}

impl From<Flag> for u8 {
	#[inline]
	fn from(flag: Flag) -> Self {
		flag as u8
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_every_known_value() {
		for &byte in &[5u8, 6, 8, 9, 10, 16, 17, 18, 36, 37, 38] {
			let flag = Flag::from_byte(byte).unwrap();
			assert_eq!(u8::from(flag), byte);
		}
	}

	#[test]
	fn rejects_unknown_value() {
		assert!(Flag::from_byte(0).is_none());
		assert!(Flag::from_byte(255).is_none());
	}

	#[test]
	fn is_data_covers_all_three_resend_variants() {
		assert!(Flag::Data.is_data());
		assert!(Flag::DataResent.is_data());
		assert!(Flag::DataTimeoutResend.is_data());
		assert!(!Flag::Rr.is_data());
	}
}
