//! The receiver's out-of-order reassembly ring.
//!
//! Ported from `ReceiverBuffer` (`prog3_rcopy/windowing.c`) and the
//! in-order/buffer/flush handling in `prog3_rcopy/rcopy.c`. The three
//! original client states `INORDER`/`BUFFER`/`FLUSH` are collapsed here into
//! arrival handling (`on_data`) plus a single `drain` operation; the
//! vestigial empty-slot branch of the original `flush()` is not reproduced.

/// What the caller of [`ReceiverBuffer::on_data`] or [`ReceiverBuffer::drain`]
/// should do in response to a DATA arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	/// The packet (or buffered run starting at it) was delivered in order.
	/// `bytes` is the concatenation of every payload flushed this call, in
	/// order; it is empty if nothing new became deliverable.
	Delivered { bytes: Vec<u8> },
	/// A gap was observed; emit `Srej(next_seq_num)` followed by
	/// `Rr(next_seq_num)` as specified.
	Gap { next_seq_num: u32 },
	/// A duplicate (already-delivered) sequence arrived; emit `Rr(next_seq_num)`.
	Duplicate { next_seq_num: u32 },
}

struct Slot {
	seq: u32,
	payload: Vec<u8>,
	valid: bool,
}

impl Slot {
	fn empty() -> Self {
		Self { seq: 0, payload: Vec::new(), valid: false }
	}
}

/// A fixed-size ring of `size` slots plus `nextSeqNum`/`highest`.
/// Invariant: every valid slot holds a sequence in `[nextSeqNum, nextSeqNum + size)`.
pub struct ReceiverBuffer {
	slots: Vec<Slot>,
	size: u32,
	next_seq_num: u32,
	highest: u32,
}

impl ReceiverBuffer {
	pub fn new(size: u32) -> Self {
		Self {
			slots: (0..size).map(|_| Slot::empty()).collect(),
			size,
			next_seq_num: 0,
			highest: 0,
		}
	}

	pub fn next_seq_num(&self) -> u32 {
		self.next_seq_num
	}

	pub fn highest(&self) -> u32 {
		self.highest
	}

	/// True once every sequence up to `highest` has been delivered.
	pub fn is_caught_up(&self) -> bool {
		self.next_seq_num == self.highest
	}

	/// Handle an arriving, checksum-verified DATA packet: in-order packets
	/// are delivered (and any now-contiguous buffered run is flushed with
	/// them), future packets open or extend a gap, and duplicates are
	/// discarded.
	pub fn on_data(&mut self, seq: u32, payload: &[u8]) -> Outcome {
		use std::cmp::Ordering::*;

		match seq.cmp(&self.next_seq_num) {
			Less => Outcome::Duplicate { next_seq_num: self.next_seq_num },
			Greater => {
				self.insert(seq, payload);
				self.highest = self.highest.max(seq);
				Outcome::Gap { next_seq_num: self.next_seq_num }
			}
			Equal => {
				let mut bytes = payload.to_vec();
				self.next_seq_num += 1;
				bytes.extend(self.drain_contiguous());
				self.highest = self.highest.max(self.next_seq_num);
				Outcome::Delivered { bytes }
			}
		}
	}

	/// Re-inspect the buffer for a contiguous run starting at `nextSeqNum`,
	/// e.g. after a retransmit filled in a previously missing slot. Delivers
	/// everything contiguous, and if a gap remains, reports it instead of
	/// going idle.
	pub fn drain(&mut self) -> Outcome {
		let bytes = self.drain_contiguous();
		if !bytes.is_empty() {
			return Outcome::Delivered { bytes };
		}
		if self.next_seq_num < self.highest {
			Outcome::Gap { next_seq_num: self.next_seq_num }
		} else {
			Outcome::Duplicate { next_seq_num: self.next_seq_num }
		}
	}

	fn insert(&mut self, seq: u32, payload: &[u8]) {
		let index = (seq % self.size) as usize;
		let slot = &mut self.slots[index];
		slot.seq = seq;
		slot.payload.clear();
		slot.payload.extend_from_slice(payload);
		slot.valid = true;
	}

	fn drain_contiguous(&mut self) -> Vec<u8> {
		let mut out = Vec::new();
		loop {
			let index = (self.next_seq_num % self.size) as usize;
			let slot = &mut self.slots[index];
			if !slot.valid || slot.seq != self.next_seq_num {
				break;
			}
			out.extend_from_slice(&slot.payload);
			slot.valid = false;
			self.next_seq_num += 1;
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn in_order_delivery_advances_next_seq_num() {
		let mut b = ReceiverBuffer::new(4);
		assert_eq!(b.on_data(0, b"ab"), Outcome::Delivered { bytes: b"ab".to_vec() });
		assert_eq!(b.next_seq_num(), 1);
	}

	#[test]
	fn future_packet_opens_gap_and_is_buffered() {
		let mut b = ReceiverBuffer::new(4);
		assert_eq!(b.on_data(2, b"cd"), Outcome::Gap { next_seq_num: 0 });
		assert_eq!(b.highest(), 2);
		assert_eq!(b.next_seq_num(), 0);
	}

	#[test]
	fn filling_gap_flushes_buffered_run() {
		let mut b = ReceiverBuffer::new(4);
		b.on_data(1, b"B");
		b.on_data(2, b"C");
		let outcome = b.on_data(0, b"A");
		assert_eq!(outcome, Outcome::Delivered { bytes: b"ABC".to_vec() });
		assert_eq!(b.next_seq_num(), 3);
	}

	#[test]
	fn duplicate_below_next_seq_num_is_discarded() {
		let mut b = ReceiverBuffer::new(4);
		b.on_data(0, b"A");
		assert_eq!(b.on_data(0, b"A"), Outcome::Duplicate { next_seq_num: 1 });
		assert_eq!(b.next_seq_num(), 1);
	}

	#[test]
	fn partial_run_leaves_a_gap_reported_on_drain() {
		let mut b = ReceiverBuffer::new(4);
		b.on_data(0, b"A");
		b.on_data(3, b"D");
		assert_eq!(b.drain(), Outcome::Gap { next_seq_num: 1 });
	}

	#[test]
	fn caught_up_once_next_seq_num_reaches_highest() {
		let mut b = ReceiverBuffer::new(4);
		b.on_data(0, b"A");
		assert!(b.is_caught_up());
		b.on_data(2, b"C");
		assert!(!b.is_caught_up());
		b.on_data(1, b"B");
		assert!(b.is_caught_up());
	}

	#[test]
	fn repeated_delivery_of_same_packet_is_safe() {
		let mut b1 = ReceiverBuffer::new(4);
		b1.on_data(0, b"A");

		let mut b2 = ReceiverBuffer::new(4);
		b2.on_data(0, b"A");
		b2.on_data(0, b"A");

		assert_eq!(b1.next_seq_num(), b2.next_seq_num());
	}
}
