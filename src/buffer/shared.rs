//! `SharedBuffer`: a contiguous byte region with an address, a length, optional NUMA
//! affinity, and an optional circular-alias property.
//!
//! The container is whatever keeps the backing memory alive — a plain `Vec<u8>` for
//! heap allocations, or a doubled `Vec<u8>` for the circular manager's wrap-around
//! region (see `manager::circular`). Slices into a `SharedBuffer` are expressed as
//! `(address, length)` pairs relative to the container's base pointer; the container is
//! kept alive by `Arc` for as long as any chunk references it.

use std::sync::Arc;

/// Owns the actual bytes backing one or more `SharedBuffer` views. Kept behind an `Arc`
/// so that slices (and the `ManagedBuffer`s built on top of them) can outlive the call
/// that allocated the region.
#[derive(Debug)]
pub struct BufferContainer {
    bytes: Vec<u8>,
    /// NUMA node the allocation was made on, if the allocator recorded one. Advisory only
    /// — nothing in the core pins threads to it; it is surfaced for allocator policies
    /// that want to pair buffer affinity with actor affinity.
    node_affinity: Option<i32>,
}

impl BufferContainer {
    pub fn new(len: usize) -> Arc<Self> {
        Arc::new(Self { bytes: vec![0u8; len], node_affinity: None })
    }

    pub fn with_affinity(len: usize, node_affinity: i32) -> Arc<Self> {
        Arc::new(Self { bytes: vec![0u8; len], node_affinity: Some(node_affinity) })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn node_affinity(&self) -> Option<i32> {
        self.node_affinity
    }

    /// Raw pointer to the start of the backing storage. Only ever dereferenced through
    /// `SharedBuffer::as_slice`/`as_mut_slice`, which re-derive a bounds-checked slice
    /// from `(address, length)` rather than trusting the pointer alone.
    fn base_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    fn base_ptr_mut(self: &Arc<Self>) -> *mut u8 {
        // SAFETY funnel: all mutation of the shared bytes goes through `SharedBuffer`
        // slices whose (address, length) are validated against this container's bounds
        // at construction time (`SharedBuffer::slice`), and the actor model guarantees a
        // single writer touches a given managed buffer at a time (§5).
        self.bytes.as_ptr() as *mut u8
    }

    /// Duplicate a just-written span `[start, start+len)` (with `start < half`, `len <=
    /// half`) into its mirror location in the other half of a doubled circular
    /// container, splitting at the seam if the span crosses it. Called by
    /// `CircularBufferManager::pop` after each produce so a later read whose window
    /// straddles the wrap point still sees contiguous, up-to-date bytes.
    pub(crate) fn mirror_circular_write(self: &Arc<Self>, start: usize, len: usize, half: usize) {
        if len == 0 {
            return;
        }
        debug_assert!(start < half);
        debug_assert!(len <= half);
        let base = self.base_ptr_mut();
        let first_len = (half - start).min(len);
        // SAFETY: `start + half + first_len <= 2*half == self.bytes.len()` since
        // `start < half` and `first_len <= half - start`; source and destination ranges
        // are `half` bytes apart and `first_len <= half`, so they cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(base.add(start), base.add(start + half), first_len);
        }
        let remaining = len - first_len;
        if remaining > 0 {
            // The span crossed the seam: the tail physically landed in the second half
            // at `[half, half+remaining)` and mirrors back down to `[0, remaining)`.
            unsafe {
                std::ptr::copy_nonoverlapping(base.add(half), base.add(0), remaining);
            }
        }
    }
}

/// A view over a `BufferContainer`: an address (byte offset from the container's base,
/// stored as the spec's "machine pointer as integer" would be, but kept as an offset so
/// Rust's aliasing rules can be honored), a length, and — for circular buffers — a
/// nonzero `alias` marking that reads/writes may wrap by up to `length` bytes past the
/// nominal end.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    container: Arc<BufferContainer>,
    /// Offset in bytes from the container's base pointer.
    offset: usize,
    length: usize,
    /// `Some(wrap_offset)` for a circular alias; the region `[offset, offset+length)`
    /// AND the mirrored region `[wrap_offset, wrap_offset+length)` refer to the same
    /// logical bytes. Zero/`None` for ordinary linear buffers.
    alias: Option<usize>,
}

impl SharedBuffer {
    pub fn allocate(len: usize) -> Self {
        let container = BufferContainer::new(len);
        Self { container, offset: 0, length: len, alias: None }
    }

    pub fn allocate_with_affinity(len: usize, node_affinity: i32) -> Self {
        let container = BufferContainer::with_affinity(len, node_affinity);
        Self { container, offset: 0, length: len, alias: None }
    }

    /// Construct a circular buffer: backing storage twice `len` bytes, with the second
    /// half kept byte-identical to the first via mirrored writes (see
    /// `manager::circular`). `alias` is set to `len`, documenting that addresses up to
    /// `offset + length + length` are in-bounds.
    pub(crate) fn circular(container: Arc<BufferContainer>, offset: usize, length: usize) -> Self {
        Self { container, offset, length, alias: Some(length) }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_circular(&self) -> bool {
        self.alias.is_some()
    }

    pub fn node_affinity(&self) -> Option<i32> {
        self.container.node_affinity()
    }

    /// Bound to honor: `[0, address+length)` normally, `[0, address+length+length)` when
    /// this is a circular alias.
    fn max_valid_end(&self) -> usize {
        match self.alias {
            Some(wrap) => self.offset + self.length + wrap,
            None => self.container.len(),
        }
    }

    /// A sub-slice `[start, start+len)` relative to this buffer's own address. Panics if
    /// out of bounds for a linear buffer; for a circular buffer, the slice is allowed to
    /// run past the nominal end as long as it stays within the wrap-around bound.
    pub fn slice(&self, start: usize, len: usize) -> SharedBuffer {
        let new_offset = self.offset + start;
        assert!(
            new_offset + len <= self.max_valid_end(),
            "SharedBuffer::slice out of bounds: offset {} len {} exceeds container bound {}",
            new_offset,
            len,
            self.max_valid_end()
        );
        SharedBuffer { container: Arc::clone(&self.container), offset: new_offset, length: len, alias: self.alias }
    }

    pub fn as_slice(&self) -> &[u8] {
        let base = self.container.base_ptr();
        let container_len = self.container.len();
        if self.offset + self.length <= container_len {
            // SAFETY: offset+length validated at construction against the container.
            unsafe { std::slice::from_raw_parts(base.add(self.offset), self.length) }
        } else {
            // Wrap-around read: only reachable when `alias` is set, and the container is
            // exactly twice the logical buffer size, so this subtraction is in-bounds.
            debug_assert!(self.alias.is_some());
            let start = self.offset % container_len.max(1);
            unsafe { std::slice::from_raw_parts(base.add(start), self.length) }
        }
    }

    pub fn as_mut_slice(&self) -> &mut [u8] {
        let container_len = self.container.len();
        let base = self.container.base_ptr_mut();
        if self.offset + self.length <= container_len {
            unsafe { std::slice::from_raw_parts_mut(base.add(self.offset), self.length) }
        } else {
            debug_assert!(self.alias.is_some());
            let start = self.offset % container_len.max(1);
            unsafe { std::slice::from_raw_parts_mut(base.add(start), self.length) }
        }
    }

    /// Pointer identity used by `BufferAccumulator::push` to detect "this chunk abuts the
    /// previous one in the same container and can be merged instead of enqueued".
    pub(crate) fn container_ptr(&self) -> usize {
        Arc::as_ptr(&self.container) as usize
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}
