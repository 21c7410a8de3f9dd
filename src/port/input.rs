//! `InputPort`: the consumer side of a connection, owned exclusively by its `WorkerActor`.
//!
//! Labels travel attached to the `BufferChunk` they rode in on (see `buffer::chunk` and
//! `BufferAccumulator::push`'s merge path), so this port doesn't keep a separate label
//! list: `labels()` and `remove_label()` both reach straight into the accumulator's
//! front chunk, and aging-out falls out of `consume()`'s slicing for free.

use std::collections::VecDeque;

use crate::actor::message::Object;
use crate::buffer::{BufferAccumulator, BufferChunk};
use crate::dtype::DType;
use crate::error::Result;
use crate::label::{Label, LabelIteratorRange};

use super::info::PortInfo;

pub struct InputPort {
    info: PortInfo,
    accumulator: BufferAccumulator,
    messages: VecDeque<Object>,
    /// "Don't deliver less than this" — the eligibility check an upstream actor's
    /// produce budget is measured against.
    reserve_bytes: usize,
    total_elements: u64,
    domain: usize,
}

impl InputPort {
    pub fn new(name: impl Into<String>, dtype: DType, domain: usize) -> Self {
        Self {
            info: PortInfo::new(name, dtype),
            accumulator: BufferAccumulator::new(),
            messages: VecDeque::new(),
            reserve_bytes: 0,
            total_elements: 0,
            domain,
        }
    }

    pub fn info(&self) -> &PortInfo {
        &self.info
    }

    pub fn domain(&self) -> usize {
        self.domain
    }

    pub fn dtype(&self) -> &DType {
        self.info.dtype()
    }

    pub fn set_reserve(&mut self, bytes: usize) {
        self.reserve_bytes = bytes;
    }

    pub fn reserve(&self) -> usize {
        self.reserve_bytes
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn bytes_available(&self) -> u64 {
        self.accumulator.total_bytes_available()
    }

    /// The current front chunk, valid until the next `consume()`.
    pub fn buffer(&self) -> Result<&BufferChunk> {
        self.accumulator.front()
    }

    /// Advance `total_elements` by `n / dtype.size()` and drop `n` bytes from the
    /// accumulator. Labels whose span no longer reaches the new front origin are
    /// dropped as part of the accumulator's own slicing — no separate bookkeeping needed.
    pub fn consume(&mut self, num_bytes: usize) {
        let elem_size = self.info.dtype().size().max(1);
        self.accumulator.pop(num_bytes);
        self.total_elements += (num_bytes / elem_size) as u64;
    }

    /// Labels whose index falls within the currently visible front chunk.
    pub fn labels(&self) -> LabelIteratorRange<'_> {
        match self.accumulator.front() {
            Ok(chunk) => LabelIteratorRange::new(chunk.labels(), chunk.elements()),
            Err(_) => LabelIteratorRange::new(&[], 0),
        }
    }

    /// Erase a label by identity: same id, index, and underlying data handle.
    pub fn remove_label(&mut self, target: &Label) {
        if let Ok(chunk) = self.accumulator.front_mut() {
            chunk
                .labels_mut()
                .retain(|l| !(l.id() == target.id() && l.index() == target.index() && std::ptr::eq(l.data(), target.data())));
        }
    }

    pub fn has_message(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn pop_message(&mut self) -> Option<Object> {
        self.messages.pop_front()
    }

    /// Called by the owning `WorkerActor` when a `LabeledBuffer` message arrives for
    /// this port. The chunk already carries its own labels.
    pub(crate) fn deliver_buffer(&mut self, chunk: BufferChunk) {
        self.accumulator.push(chunk);
    }

    pub(crate) fn deliver_message(&mut self, payload: Object) {
        self.messages.push_back(payload);
    }
}
