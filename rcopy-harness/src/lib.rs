//! A deterministic error-injection collaborator for exercising the `rcopy`
//! protocol over a lossy, corrupting channel.
//!
//! This crate knows nothing about PDUs or sessions — it only decides, per
//! datagram, whether to drop it or flip a bit in it. `rcopy-cli` wraps a
//! real `DatagramChannel` with these decisions on its way out the socket.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// How the harness's RNG is seeded.
#[derive(Debug, Clone, Copy)]
pub enum Seed {
	/// Reproducible runs, e.g. for the end-to-end test scenarios.
	Fixed(u64),
	/// Seeded from the OS, for real client/server invocations.
	FromEntropy,
}

/// What happened to a datagram this harness was asked to inject errors into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// Send it unmodified.
	Keep,
	/// Do not send it at all.
	Drop,
	/// Send it with a single bit flipped, corrupting its checksum.
	Flip,
}

/// Per-datagram error injection at a single configured rate, split evenly
/// between drops and corruptions, with each kind independently switchable —
/// mirroring the original's `DROP_ON`/`DROP_OFF` and `FLIP_ON`/`FLIP_OFF`
/// toggles. A disabled kind never fires regardless of `rate`; the client and
/// server binaries default these oppositely (client off, server on), but
/// both are overridable from the command line.
#[derive(Debug)]
pub struct ChannelError {
	rate: f64,
	drop_enabled: bool,
	flip_enabled: bool,
	rng: StdRng,
}

impl ChannelError {
	pub fn new(rate: f64, drop_enabled: bool, flip_enabled: bool, seed: Seed) -> Self {
		assert!((0.0..1.0).contains(&rate), "error rate must be in [0, 1)");
		let rng = match seed {
			Seed::Fixed(s) => StdRng::seed_from_u64(s),
			Seed::FromEntropy => StdRng::from_entropy(),
		};
		Self { rate, drop_enabled, flip_enabled, rng }
	}

	/// Roll the dice for one outgoing datagram. Drop and corruption are
	/// independent events; a dropped datagram is reported as `Drop` even if
	/// it would also have been corrupted, since there is nothing left to flip.
	/// A disabled kind never contributes a roll, so disabling both always
	/// yields `Keep` no matter what `rate` is.
	pub fn decide(&mut self) -> Decision {
		if self.rate <= 0.0 {
			return Decision::Keep;
		}
		if self.drop_enabled && self.rng.gen_bool(self.rate) {
			return Decision::Drop;
		}
		if self.flip_enabled && self.rng.gen_bool(self.rate) {
			return Decision::Flip;
		}
		Decision::Keep
	}

	/// Flip the low bit of a byte near the middle of `bytes`, guaranteeing the
	/// PDU's checksum no longer validates without truncating or resizing it.
	pub fn corrupt(bytes: &mut [u8]) {
		if let Some(byte) = bytes.get_mut(bytes.len() / 2) {
			*byte ^= 0x01;
		}
	}
}
