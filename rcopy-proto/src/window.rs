//! The sender's sliding window of in-flight DATA packets.
//!
//! Ported from the original `SenderWindow` (`prog3_rcopy/windowing.c`), with
//! the `lower`/`current`/`upper` counters and slot storage generalized from
//! fixed C arrays to a `Vec` sized at construction time.

use crate::framing::Flag;

/// One sender-side in-flight packet. Holds enough to retransmit it verbatim.
#[derive(Debug, Clone)]
pub struct Slot {
	pub seq: u32,
	pub flag: Flag,
	pub payload: Vec<u8>,
	pub valid: bool,
}

impl Slot {
	fn empty() -> Self {
		Self { seq: 0, flag: Flag::Data, payload: Vec::new(), valid: false }
	}
}

/// A fixed-size ring of `windowSize` slots plus the `lower`/`current`/`upper`
/// counters. Invariant: `lower <= current <= upper` and
/// `upper == lower + windowSize` always holds between calls.
pub struct SenderWindow {
	slots: Vec<Slot>,
	lower: u32,
	current: u32,
	window_size: u32,
	/// Consecutive timeouts observed at the current `lower`. Reset whenever
	/// `lower` advances; used to trigger the "peer unreachable" abort.
	timeouts_at_lower: u32,
}

impl SenderWindow {
	pub fn new(window_size: u8) -> Self {
		let window_size = window_size as u32;
		Self {
			slots: (0..window_size).map(|_| Slot::empty()).collect(),
			lower: 0,
			current: 0,
			window_size,
			timeouts_at_lower: 0,
		}
	}

	pub fn lower(&self) -> u32 {
		self.lower
	}

	pub fn current(&self) -> u32 {
		self.current
	}

	pub fn upper(&self) -> u32 {
		self.lower + self.window_size
	}

	/// True while the sender may emit a new DATA packet.
	pub fn is_open(&self) -> bool {
		self.current - self.lower < self.window_size
	}

	/// True once every in-flight packet has been acknowledged.
	pub fn is_drained(&self) -> bool {
		self.lower == self.current
	}

	/// Record a just-transmitted packet at `seq mod windowSize` and advance `current`.
	/// Panics if called while the window is closed or out of sequence — callers
	/// must check [`is_open`](Self::is_open) first.
	pub fn record(&mut self, seq: u32, flag: Flag, payload: &[u8]) {
		assert!(self.is_open(), "record called on a closed window");
		assert_eq!(seq, self.current, "sender window records packets in sequence order");

		let index = (seq % self.window_size) as usize;
		let slot = &mut self.slots[index];
		slot.seq = seq;
		slot.flag = flag;
		slot.payload.clear();
		slot.payload.extend_from_slice(payload);
		slot.valid = true;

		self.current += 1;
	}

	/// Apply a cumulative RR: slide `lower` up to `next_expected`, invalidating
	/// every slot whose sequence falls below the new `lower`. Idempotent (L1):
	/// an RR at or below the current `lower` is a no-op.
	pub fn on_rr(&mut self, next_expected: u32) {
		if next_expected <= self.lower {
			return;
		}

		let advance = next_expected.min(self.current) - self.lower;

		for offset in 0..advance {
			let seq = self.lower + offset;
			let index = (seq % self.window_size) as usize;
			if self.slots[index].valid && self.slots[index].seq == seq {
				self.slots[index].valid = false;
			}
		}

		self.lower += advance;
		self.timeouts_at_lower = 0;
	}

	/// Look up the packet cached for sequence `seq`.
	/// Returns `None` if the slot is stale (already acknowledged) or never held `seq`.
	fn lookup(&self, seq: u32) -> Option<&Slot> {
		if seq < self.lower || seq >= self.current {
			return None;
		}
		let index = (seq % self.window_size) as usize;
		let slot = &self.slots[index];
		(slot.valid && slot.seq == seq).then_some(slot)
	}

	/// Handle a selective reject for `seq`: the packet to retransmit, or
	/// `None` if a crossing RR already slid `lower` past it (the SREJ was
	/// stale by the time it arrived, and the caller should simply drop it).
	pub fn on_srej(&self, seq: u32) -> Option<&Slot> {
		self.lookup(seq)
	}

	/// The oldest unacknowledged packet, used for timeout-driven retransmission.
	pub fn oldest(&self) -> Option<&Slot> {
		self.lookup(self.lower)
	}

	/// Record a timeout at the current `lower`. Returns `true` once the
	/// caller has hit 10 consecutive timeouts without any advance of
	/// `lower` — the signal to give up on the peer entirely.
	pub fn record_timeout(&mut self) -> bool {
		self.timeouts_at_lower += 1;
		self.timeouts_at_lower >= 10
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn opens_and_closes_with_window_size() {
		let mut w = SenderWindow::new(4);
		assert!(w.is_open());
		for seq in 0..4 {
			w.record(seq, Flag::Data, &[]);
		}
		assert!(!w.is_open());
	}

	#[test]
	fn on_rr_slides_lower_and_invalidates_slots() {
		let mut w = SenderWindow::new(4);
		for seq in 0..4 {
			w.record(seq, Flag::Data, &[seq as u8]);
		}
		w.on_rr(2);
		assert_eq!(w.lower(), 2);
		assert!(w.upper() == 6);
		assert!(w.is_open());
		assert!(w.on_srej(0).is_none());
		assert!(w.on_srej(1).is_none());
		assert!(w.on_srej(2).is_some());
	}

	#[test]
	fn on_rr_is_idempotent() {
		let mut w = SenderWindow::new(4);
		for seq in 0..4 {
			w.record(seq, Flag::Data, &[]);
		}
		w.on_rr(3);
		let lower_after_first = w.lower();
		w.on_rr(3);
		assert_eq!(w.lower(), lower_after_first);
		w.on_rr(1);
		assert_eq!(w.lower(), lower_after_first);
	}

	#[test]
	fn oldest_is_none_once_window_is_drained() {
		let mut w = SenderWindow::new(2);
		w.record(0, Flag::Data, &[]);
		w.record(1, Flag::Data, &[]);
		w.on_rr(2);
		assert!(w.is_drained());
		assert!(w.oldest().is_none());
	}

	#[test]
	fn ten_consecutive_timeouts_trigger_abort() {
		let mut w = SenderWindow::new(1);
		w.record(0, Flag::Data, &[]);
		for _ in 0..9 {
			assert!(!w.record_timeout());
		}
		assert!(w.record_timeout());
	}

	#[test]
	fn timeout_counter_resets_on_advance() {
		let mut w = SenderWindow::new(2);
		w.record(0, Flag::Data, &[]);
		w.record(1, Flag::Data, &[]);
		assert!(!w.record_timeout());
		assert!(!w.record_timeout());
		w.on_rr(1);
		for _ in 0..9 {
			assert!(!w.record_timeout());
		}
	}

	#[test]
	fn window_size_one_degenerates_to_stop_and_wait() {
		let mut w = SenderWindow::new(1);
		assert!(w.is_open());
		w.record(0, Flag::Data, &[]);
		assert!(!w.is_open());
		w.on_rr(1);
		assert!(w.is_open());
	}
}
