//! Validated session configuration.

use crate::error::ConfigError;
use crate::framing::{MAX_BUFFER_SIZE, MAX_FILENAME_LEN, MIN_BUFFER_SIZE};

/// Configuration for one client-side transfer. Constructed once from CLI
/// arguments and held for the lifetime of the session — no globals.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	pub from_filename: String,
	pub to_filename: String,
	pub window_size: u8,
	pub buffer_size: u16,
	pub error_rate: f64,
	pub remote_host: String,
	pub remote_port: u16,
}

impl ClientConfig {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		from_filename: String,
		to_filename: String,
		window_size: u32,
		buffer_size: u16,
		error_rate: f64,
		remote_host: String,
		remote_port: u16,
	) -> Result<Self, ConfigError> {
		validate_filename(&from_filename)?;
		validate_filename(&to_filename)?;
		let window_size = validate_window_size(window_size)?;
		validate_buffer_size(buffer_size)?;
		validate_error_rate(error_rate)?;

		Ok(Self {
			from_filename,
			to_filename,
			window_size,
			buffer_size,
			error_rate,
			remote_host,
			remote_port,
		})
	}
}

/// Configuration for the server listener. Per-session window/buffer sizes
/// are negotiated from the client's FILENAME PDU, not configured here.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub error_rate: f64,
	/// 0 means OS-assigned.
	pub port: u16,
}

impl ServerConfig {
	pub fn new(error_rate: f64, port: u16) -> Result<Self, ConfigError> {
		validate_error_rate(error_rate)?;
		Ok(Self { error_rate, port })
	}
}

fn validate_filename(name: &str) -> Result<(), ConfigError> {
	if name.len() > MAX_FILENAME_LEN {
		return Err(ConfigError::FilenameTooLong { len: name.len() });
	}
	Ok(())
}

fn validate_window_size(window_size: u32) -> Result<u8, ConfigError> {
	if window_size == 0 {
		return Err(ConfigError::WindowSizeZero);
	}
	u8::try_from(window_size).map_err(|_| ConfigError::WindowSizeTooLarge(window_size))
}

fn validate_buffer_size(buffer_size: u16) -> Result<(), ConfigError> {
	if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&buffer_size) {
		return Err(ConfigError::BufferSizeOutOfRange { got: buffer_size });
	}
	Ok(())
}

fn validate_error_rate(error_rate: f64) -> Result<(), ConfigError> {
	if !(0.0..1.0).contains(&error_rate) {
		return Err(ConfigError::ErrorRateOutOfRange(error_rate));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn valid_client() -> Result<ClientConfig, ConfigError> {
		ClientConfig::new("a.txt".into(), "b.txt".into(), 4, 1000, 0.1, "localhost".into(), 9000)
	}

	#[test]
	fn accepts_valid_configuration() {
		assert!(valid_client().is_ok());
	}

	#[test]
	fn rejects_filename_over_the_limit() {
		let long_name = "x".repeat(MAX_FILENAME_LEN as usize + 1);
		let err = ClientConfig::new(long_name, "b.txt".into(), 4, 1000, 0.1, "localhost".into(), 9000).unwrap_err();
		assert!(matches!(err, ConfigError::FilenameTooLong { .. }));
	}

	#[test]
	fn rejects_buffer_size_outside_policy_extremes() {
		assert!(matches!(
			ClientConfig::new("a".into(), "b".into(), 4, 399, 0.0, "h".into(), 1).unwrap_err(),
			ConfigError::BufferSizeOutOfRange { got: 399 }
		));
		assert!(matches!(
			ClientConfig::new("a".into(), "b".into(), 4, 1401, 0.0, "h".into(), 1).unwrap_err(),
			ConfigError::BufferSizeOutOfRange { got: 1401 }
		));
		assert!(ClientConfig::new("a".into(), "b".into(), 4, 400, 0.0, "h".into(), 1).is_ok());
		assert!(ClientConfig::new("a".into(), "b".into(), 4, 1400, 0.0, "h".into(), 1).is_ok());
	}

	#[test]
	fn rejects_error_rate_outside_unit_interval() {
		assert!(matches!(
			ClientConfig::new("a".into(), "b".into(), 4, 1000, 1.0, "h".into(), 1).unwrap_err(),
			ConfigError::ErrorRateOutOfRange(_)
		));
		assert!(matches!(
			ClientConfig::new("a".into(), "b".into(), 4, 1000, -0.1, "h".into(), 1).unwrap_err(),
			ConfigError::ErrorRateOutOfRange(_)
		));
	}

	#[test]
	fn rejects_window_size_that_does_not_fit_a_byte() {
		let err = ClientConfig::new("a".into(), "b".into(), 256, 1000, 0.0, "h".into(), 1).unwrap_err();
		assert_eq!(err, ConfigError::WindowSizeTooLarge(256));
	}

	#[test]
	fn rejects_zero_window_size() {
		let err = ClientConfig::new("a".into(), "b".into(), 0, 1000, 0.0, "h".into(), 1).unwrap_err();
		assert_eq!(err, ConfigError::WindowSizeZero);
	}

	#[test]
	fn server_config_validates_error_rate_only() {
		assert!(ServerConfig::new(0.5, 0).is_ok());
		assert!(ServerConfig::new(1.0, 0).is_err());
	}
}
