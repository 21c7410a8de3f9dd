//! Property-based coverage for `BufferAccumulator`'s byte-conservation and contiguity
//! guarantees (SPEC_FULL.md §8, "Invariants"): pushing arbitrary chunks and popping
//! arbitrary amounts never loses or duplicates a byte, and `require(n)` always leaves
//! the front span at least `n` bytes long.

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use pothos_core::dtype::DType;
use pothos_core::{BufferAccumulator, BufferChunk, SharedBuffer};

fn chunk_of(bytes: &[u8]) -> BufferChunk {
    let shared = SharedBuffer::allocate(bytes.len());
    shared.as_mut_slice().copy_from_slice(bytes);
    BufferChunk::from_shared(shared, DType::uint8())
}

proptest! {
    /// Pushing a series of byte chunks and draining the whole thing in one `require` +
    /// `pop` reproduces the exact concatenation of what went in, in order.
    #[test]
    fn require_then_pop_reproduces_pushed_bytes(
        chunks in prop_vec(prop_vec(any::<u8>(), 0..64), 0..16),
    ) {
        let mut accumulator = BufferAccumulator::new();
        let mut expected = Vec::new();
        for bytes in &chunks {
            expected.extend_from_slice(bytes);
            accumulator.push(chunk_of(bytes));
        }

        if expected.is_empty() {
            prop_assert!(accumulator.is_empty());
            return Ok(());
        }

        accumulator.require(expected.len())?;
        let front = accumulator.front()?;
        prop_assert!(front.len() >= expected.len());
        prop_assert_eq!(&front.as_bytes()[..expected.len()], expected.as_slice());

        accumulator.pop(expected.len());
        prop_assert!(accumulator.is_empty());
        prop_assert_eq!(accumulator.total_bytes_available(), 0);
    }

    /// Popping in arbitrary-sized increments (rather than all at once) still accounts for
    /// every byte exactly once and never leaves the running total negative.
    #[test]
    fn incremental_pop_conserves_total_bytes(
        chunks in prop_vec(prop_vec(any::<u8>(), 1..32), 1..8),
        pop_sizes in prop_vec(1usize..24, 1..16),
    ) {
        let mut accumulator = BufferAccumulator::new();
        let mut total = 0u64;
        for bytes in &chunks {
            total += bytes.len() as u64;
            accumulator.push(chunk_of(bytes));
        }
        prop_assert_eq!(accumulator.total_bytes_available(), total);

        let mut remaining = total;
        for requested in pop_sizes {
            let take = (requested as u64).min(remaining);
            if take == 0 {
                continue;
            }
            accumulator.pop(take as usize);
            remaining -= take;
            prop_assert_eq!(accumulator.total_bytes_available(), remaining);
        }
    }

    /// `require(n)` on an accumulator that doesn't have `n` bytes queued reports a
    /// capacity error rather than panicking or returning a short span.
    #[test]
    fn require_past_available_bytes_errors(
        chunks in prop_vec(prop_vec(any::<u8>(), 0..16), 0..4),
        extra in 1usize..64,
    ) {
        let mut accumulator = BufferAccumulator::new();
        let mut total = 0usize;
        for bytes in &chunks {
            total += bytes.len();
            accumulator.push(chunk_of(bytes));
        }
        prop_assert!(accumulator.require(total + extra).is_err());
    }

    /// Two chunks sliced from the same backing container and pushed back to back merge
    /// into one queue entry (the abutting-merge fast path) instead of staying split,
    /// regardless of how the split point falls.
    #[test]
    fn abutting_slices_merge_without_copying(
        total_len in 2usize..256,
        split in 0usize..256,
    ) {
        let split = split % total_len.max(1);
        let shared = SharedBuffer::allocate(total_len);
        for (i, b) in shared.as_mut_slice().iter_mut().enumerate() {
            *b = i as u8;
        }
        let whole = BufferChunk::from_shared(shared, DType::uint8());
        let first = whole.slice_elements(0, split);
        let second = whole.slice_elements(split, total_len - split);

        let mut accumulator = BufferAccumulator::new();
        accumulator.push(first);
        accumulator.push(second);

        prop_assert_eq!(accumulator.unique_managed_buffer_count(), 0);
        let front = accumulator.front()?;
        prop_assert_eq!(front.len(), total_len);
    }
}
