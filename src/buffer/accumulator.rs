//! `BufferAccumulator`: the queue an `InputPort` maintains between what it has received
//! and what the block has actually consumed. Abutting chunks are merged in place so a
//! `front()`/`require()` call can see a span larger than any single produced chunk
//! without copying, and copying only ever happens in `require()` when a caller asks for
//! more contiguous bytes than the current front span holds.

use std::collections::VecDeque;

use crate::dtype::DType;
use crate::error::{PothosError, Result};

use super::chunk::{self, BufferChunk};
use super::shared::SharedBuffer;

#[derive(Default)]
pub struct BufferAccumulator {
    chunks: VecDeque<BufferChunk>,
    total_bytes: u64,
}

impl BufferAccumulator {
    pub fn new() -> Self {
        Self { chunks: VecDeque::new(), total_bytes: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total bytes currently queued across every chunk.
    pub fn total_bytes_available(&self) -> u64 {
        self.total_bytes
    }

    /// Number of distinct `ManagedBuffer` loans contributing to the queue, counting a
    /// chunk's primary loan and every loan folded into it by a prior merge.
    pub fn unique_managed_buffer_count(&self) -> usize {
        self.chunks
            .iter()
            .map(|c| c.managed().is_some() as usize + c.keep_alive_len())
            .sum()
    }

    /// Enqueue a newly arrived chunk, merging it into the tail chunk if it abuts it
    /// (same backing container, contiguous offset) rather than growing the queue.
    pub fn push(&mut self, next: BufferChunk) {
        if next.is_empty() {
            return;
        }
        self.total_bytes += next.len() as u64;
        if let Some(tail) = self.chunks.back() {
            if tail.abuts(&next) {
                let merged = chunk::extend_chunk(tail, &next);
                *self.chunks.back_mut().expect("checked above") = merged;
                return;
            }
        }
        self.chunks.push_back(next);
    }

    /// The head of the queue, exposed as a read-only view. Returns an error if the queue
    /// is empty rather than a null chunk — the spec treats `front()` on an empty
    /// accumulator as a port-access mistake, not a normal empty-stream signal.
    pub fn front(&self) -> Result<&BufferChunk> {
        self.chunks.front().ok_or_else(|| {
            PothosError::port_access("input", "front() called on an empty buffer accumulator")
        })
    }

    pub fn front_mut(&mut self) -> Result<&mut BufferChunk> {
        self.chunks.front_mut().ok_or_else(|| {
            PothosError::port_access("input", "front() called on an empty buffer accumulator")
        })
    }

    /// Drop `num_bytes` from the head of the queue, splitting or fully removing the head
    /// chunk as needed. Matches `InputPort::consume`'s element-to-byte translation at the
    /// call site; this operates purely in bytes.
    pub fn pop(&mut self, num_bytes: usize) {
        let mut remaining = num_bytes;
        while remaining > 0 {
            let head_len = match self.chunks.front() {
                Some(c) => c.len(),
                None => panic!("pop({num_bytes}) exceeds the bytes queued in the accumulator"),
            };
            if remaining < head_len {
                let head = self.chunks.pop_front().expect("checked above");
                self.chunks.push_front(head.slice_elements_bytes(remaining, head_len - remaining));
                remaining = 0;
            } else {
                self.chunks.pop_front();
                remaining -= head_len;
            }
        }
        self.total_bytes -= num_bytes as u64;
    }

    /// Guarantee that `front()` can return at least `num_bytes` contiguous bytes,
    /// copying across chunk boundaries if the head span alone is shorter than that. This
    /// is the only place the core ever copies sample data on the consumer side; producers
    /// avoid the copy entirely as long as downstream keeps up (see `push`'s merge path).
    pub fn require(&mut self, num_bytes: usize) -> Result<()> {
        if self.total_bytes < num_bytes as u64 {
            return Err(PothosError::BufferCapacity { requested: num_bytes, available: self.total_bytes as usize });
        }
        if self.chunks.front().map(|c| c.len()).unwrap_or(0) >= num_bytes {
            return Ok(());
        }

        let dtype = self.chunks.front().expect("checked by total_bytes guard above").dtype().clone();
        let shared = SharedBuffer::allocate(num_bytes);
        let mut filled = 0usize;
        let mut rebuilt_labels = Vec::new();
        while filled < num_bytes {
            let head = self.chunks.pop_front().expect("total_bytes accounting guarantees enough chunks remain");
            let take = head.len().min(num_bytes - filled);
            shared.as_mut_slice()[filled..filled + take].copy_from_slice(&head.as_bytes()[..take]);
            let elem_size = dtype.size().max(1);
            for label in head.labels() {
                let byte_index = label.index() * elem_size;
                if byte_index >= take {
                    continue;
                }
                let max_width = (take - byte_index) / elem_size;
                let width = label.width().min(max_width.max(1));
                rebuilt_labels.push(label.clone().with_index((filled + byte_index) / elem_size).with_width(width));
            }
            if take < head.len() {
                self.chunks.push_front(head.slice_elements_bytes(take, head.len() - take));
            }
            filled += take;
        }

        let mut merged = BufferChunk::from_shared(shared, dtype);
        *merged.labels_mut() = rebuilt_labels;
        self.chunks.push_front(merged);
        Ok(())
    }
}
