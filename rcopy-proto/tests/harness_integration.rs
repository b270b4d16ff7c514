//! Exercises the framing layer against `rcopy-harness`'s error injection,
//! standing in for the lossy/corrupting channel a real transfer runs over.

use rcopy_harness::{ChannelError, Decision, Seed};
use rcopy_proto::framing::{self, Flag, MAX_PDU_LEN};

#[test]
fn a_harness_corrupted_pdu_fails_verification() {
	let mut buf = [0u8; MAX_PDU_LEN];
	let len = framing::encode_data(&mut buf, 7, Flag::Data, b"payload", 4, 1000).unwrap();
	assert!(framing::verify(&buf[..len]));

	ChannelError::corrupt(&mut buf[..len]);
	assert!(!framing::verify(&buf[..len]));
}

#[test]
fn zero_error_rate_never_drops_or_corrupts_a_pdu() {
	let mut buf = [0u8; MAX_PDU_LEN];
	let len = framing::encode_control(&mut buf, 1, Flag::Rr, Some(3)).unwrap();

	let mut harness = ChannelError::new(0.0, true, true, Seed::Fixed(99));
	for _ in 0..50 {
		assert_eq!(harness.decide(), Decision::Keep);
	}
	assert!(framing::verify(&buf[..len]));
}

#[test]
fn certain_error_rate_eventually_drops_and_corrupts() {
	let mut harness = ChannelError::new(0.9, true, true, Seed::Fixed(7));
	let decisions: Vec<_> = (0..100).map(|_| harness.decide()).collect();
	assert!(decisions.contains(&Decision::Drop));
	assert!(decisions.contains(&Decision::Flip));
}
