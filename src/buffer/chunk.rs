//! `BufferChunk`: a typed, offsetable view over a `SharedBuffer`/`ManagedBuffer`.
//!
//! This is the type block authors actually touch in `work()`. It pairs a byte range with
//! a `DType` so element counts, slicing, and conversion can all be expressed in terms of
//! "samples" rather than raw bytes.

use crate::dtype::{self, DType};
use crate::error::{PothosError, Result};
use crate::label::Label;

use super::managed::ManagedBuffer;
use super::shared::SharedBuffer;

/// A byte range tagged with an element type. May be backed directly by a `SharedBuffer`
/// (e.g. a freshly allocated scratch region) or by a `ManagedBuffer` on loan from a pool
/// — in the latter case, the managed buffer's reference count is what keeps the backing
/// memory alive and, eventually, triggers its return.
#[derive(Clone)]
pub struct BufferChunk {
    shared: SharedBuffer,
    dtype: DType,
    /// Present when this chunk holds a loan from a `BufferManager`; `None` for chunks
    /// built from a raw `SharedBuffer` that isn't pool-managed (e.g. `require()`'s scratch
    /// copies before they're wrapped, or test fixtures).
    managed: Option<ManagedBuffer>,
    /// Extra managed handles folded in by `extend_chunk` when merging abutting chunks
    /// whose `managed` loans are distinct objects (the circular manager's case — the
    /// generic slab manager reuses the same handle across a run of merges, so this stays
    /// empty there). Exists purely to keep every contributing loan's refcount alive for
    /// as long as the merged chunk is; never inspected otherwise.
    keep_alive: Vec<ManagedBuffer>,
    /// Labels riding along with this chunk, already translated to be relative to this
    /// chunk's own element-index origin (see `label::Label`).
    labels: Vec<Label>,
}

impl BufferChunk {
    pub fn null() -> Self {
        Self {
            shared: SharedBuffer::allocate(0),
            dtype: DType::uint8(),
            managed: None,
            keep_alive: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn from_shared(shared: SharedBuffer, dtype: DType) -> Self {
        Self { shared, dtype, managed: None, keep_alive: Vec::new(), labels: Vec::new() }
    }

    pub fn from_managed(managed: ManagedBuffer, dtype: DType) -> Self {
        let shared = managed.shared().clone();
        Self { shared, dtype, managed: Some(managed), keep_alive: Vec::new(), labels: Vec::new() }
    }

    pub fn is_null(&self) -> bool {
        self.shared.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Element count: `length / dtype.size()`. The spec defines this as the canonical
    /// way to talk about "how many samples" a chunk holds.
    pub fn elements(&self) -> usize {
        if self.dtype.size() == 0 {
            0
        } else {
            self.shared.len() / self.dtype.size()
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.shared.as_slice()
    }

    pub fn as_bytes_mut(&self) -> &mut [u8] {
        self.shared.as_mut_slice()
    }

    pub fn managed(&self) -> Option<&ManagedBuffer> {
        self.managed.as_ref()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn labels_mut(&mut self) -> &mut Vec<Label> {
        &mut self.labels
    }

    pub(crate) fn container_ptr(&self) -> usize {
        self.shared.container_ptr()
    }

    pub(crate) fn end_offset(&self) -> usize {
        self.shared.offset() + self.shared.len()
    }

    /// A sub-view `[start_elem, start_elem+num_elem)` of this chunk, in element units.
    /// Labels are carried along, re-indexed relative to the new chunk's origin, and
    /// clipped if their span now exceeds the slice (the spec's "labels never cross a
    /// produce/consume boundary silently" rule).
    pub fn slice_elements(&self, start_elem: usize, num_elem: usize) -> BufferChunk {
        let size = self.dtype.size();
        let shared = self.shared.slice(start_elem * size, num_elem * size);
        BufferChunk {
            shared,
            dtype: self.dtype.clone(),
            managed: self.managed.clone(),
            keep_alive: self.keep_alive.clone(),
            labels: rescale_labels_for_window(&self.labels, start_elem, num_elem),
        }
    }

    pub(crate) fn keep_alive_len(&self) -> usize {
        self.keep_alive.len()
    }

    /// A sub-view `[start_byte, start_byte+len_byte)` in raw byte units, used by
    /// `BufferAccumulator` where a pop boundary need not land on an element boundary.
    /// Labels are carried over using the same rescale-and-clip rule as `slice_elements`,
    /// expressed in bytes via the chunk's own element size.
    pub(crate) fn slice_elements_bytes(&self, start_byte: usize, len_byte: usize) -> BufferChunk {
        let elem_size = self.dtype.size().max(1);
        let shared = self.shared.slice(start_byte, len_byte);
        BufferChunk {
            shared,
            dtype: self.dtype.clone(),
            managed: self.managed.clone(),
            keep_alive: self.keep_alive.clone(),
            labels: rescale_labels_for_byte_window(&self.labels, start_byte, len_byte, elem_size),
        }
    }

    /// Allocate a new-domain buffer of `newDtype` and invoke the registered conversion
    /// kernel for `(self.dtype, newDtype)`. Labels are rescaled per §4.4: index and width
    /// are multiplied by `old_size / new_size`, integer-divided toward zero, and any
    /// label whose rescaled span now exceeds the converted buffer is clipped.
    pub fn convert(&self, new_dtype: &DType) -> Result<BufferChunk> {
        if &self.dtype == new_dtype {
            return Ok(self.clone());
        }
        let kernel = dtype::lookup_conversion(&self.dtype, new_dtype).ok_or_else(|| PothosError::DTypeMismatch {
            src: self.dtype.clone(),
            dst: new_dtype.clone(),
        })?;
        let count = self.elements();
        let mut out = Vec::new();
        kernel(self.as_bytes(), count, &mut out);
        let new_elements = if new_dtype.size() == 0 { 0 } else { out.len() / new_dtype.size() };
        let shared = SharedBuffer::allocate(out.len());
        shared.as_mut_slice().copy_from_slice(&out);

        let old_size = self.dtype.size() as i64;
        let new_size = new_dtype.size().max(1) as i64;
        let mut chunk = BufferChunk {
            shared,
            dtype: new_dtype.clone(),
            managed: None,
            keep_alive: Vec::new(),
            labels: Vec::new(),
        };
        for label in &self.labels {
            let scaled_index = ((label.index() as i64) * old_size / new_size).max(0) as usize;
            let scaled_width = (((label.width() as i64) * old_size / new_size).max(1)) as usize;
            if scaled_index >= new_elements {
                continue;
            }
            let max_width = new_elements - scaled_index;
            let width = scaled_width.min(max_width.max(1));
            chunk.labels.push(label.clone().with_index(scaled_index).with_width(width));
        }
        Ok(chunk)
    }

    /// Two chunks are "contiguous" (for `BufferAccumulator::push` merging) when they
    /// share the same backing container and the second chunk's offset begins exactly
    /// where the first ends.
    pub(crate) fn abuts(&self, next: &BufferChunk) -> bool {
        self.container_ptr() == next.container_ptr() && self.end_offset() == next.shared.offset()
    }

    pub(crate) fn shared(&self) -> &SharedBuffer {
        &self.shared
    }
}

/// Concatenate two abutting chunks into a single wider chunk without copying, merging
/// their label lists (re-indexed relative to the combined origin).
pub(crate) fn extend_chunk(head: &BufferChunk, next: &BufferChunk) -> BufferChunk {
    debug_assert!(head.abuts(next));
    let combined_len = head.shared.len() + next.shared.len();
    let shared = head.shared.slice(0, combined_len);
    let mut labels = head.labels.clone();
    let head_elements = head.elements();
    for label in &next.labels {
        labels.push(label.clone().with_index(label.index() + head_elements));
    }

    // Fold every loan backing either chunk into `keep_alive` so the merged chunk holds
    // all of them, not just `head`'s — the circular manager hands out a fresh
    // `ManagedBuffer` per produce, so two abutting chunks can carry distinct loans whose
    // refcounts must both survive as long as the merged view does.
    let mut keep_alive = head.keep_alive.clone();
    keep_alive.extend(head.managed.clone());
    keep_alive.extend(next.keep_alive.iter().cloned());
    keep_alive.extend(next.managed.clone());

    BufferChunk { shared, dtype: head.dtype.clone(), managed: head.managed.clone(), keep_alive, labels }
}

/// Rebuild a label list for the sub-window `[start_elem, start_elem+num_elem)`, applying
/// the aging rule from spec.md §8 (a label is visible until `index+width <= total_elements`,
/// here `Label::aged_out(start_elem)`) rather than dropping anything that merely *starts*
/// before the window — a label whose span still reaches into the window must survive,
/// clipped to the window's local origin (spec.md §4.4).
fn rescale_labels_for_window(labels: &[Label], start_elem: usize, num_elem: usize) -> Vec<Label> {
    let end_elem = start_elem + num_elem;
    let mut out = Vec::new();
    for label in labels {
        if label.aged_out(start_elem as u64) || label.index() >= end_elem {
            continue;
        }
        let new_index = label.index().saturating_sub(start_elem);
        let label_end = label.index() + label.width();
        let new_end = label_end.min(end_elem) - start_elem;
        let width = new_end.saturating_sub(new_index).max(1);
        out.push(label.clone().with_index(new_index).with_width(width));
    }
    out
}

/// Byte-unit counterpart of `rescale_labels_for_window`, used where a window boundary
/// need not land on an element boundary (`BufferAccumulator`'s byte-granular pops).
fn rescale_labels_for_byte_window(labels: &[Label], start_byte: usize, len_byte: usize, elem_size: usize) -> Vec<Label> {
    let end_byte = start_byte + len_byte;
    let mut out = Vec::new();
    for label in labels {
        let label_start_byte = label.index() * elem_size;
        let label_end_byte = label_start_byte + label.width() * elem_size;
        if label_end_byte <= start_byte || label_start_byte >= end_byte {
            continue;
        }
        let new_start_byte = label_start_byte.max(start_byte) - start_byte;
        let new_end_byte = label_end_byte.min(end_byte) - start_byte;
        let new_index = new_start_byte / elem_size;
        let new_end_index = new_end_byte.div_ceil(elem_size);
        let width = new_end_index.saturating_sub(new_index).max(1);
        out.push(label.clone().with_index(new_index).with_width(width));
    }
    out
}

impl std::fmt::Debug for BufferChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferChunk")
            .field("len", &self.len())
            .field("dtype", &self.dtype)
            .field("elements", &self.elements())
            .field("labels", &self.labels.len())
            .finish()
    }
}
