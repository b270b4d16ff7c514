//! Small internal utilities shared across the protocol modules.

use std::fmt;

/// A helper structure for beautiful printing of bytes.
/// It provides format implementations for upper and
/// lower hex formatters (`{:x}`, `{:X}`), used when tracing raw PDUs.
pub struct BytesFmt<'a>(pub &'a [u8]);

impl fmt::UpperHex for BytesFmt<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for byte in self.0 {
			f.write_fmt(format_args!("{:02X}", byte))?;
		}
		Ok(())
	}
}

impl fmt::LowerHex for BytesFmt<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for byte in self.0 {
			f.write_fmt(format_args!("{:02x}", byte))?;
		}
		Ok(())
	}
}
