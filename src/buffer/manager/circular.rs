//! The circular buffer manager: one large region mapped so that a read/write of length
//! up to `buffer_size` is always contiguous across the wrap point, used by streaming
//! sinks that want a continuously advancing window rather than a ring of discrete slabs.
//!
//! Rust has no portable double-mapped-mmap primitive without a platform-specific crate
//! the rest of this workspace doesn't otherwise need (see SPEC_FULL.md §4.1). Instead
//! the backing container is a single heap allocation of `2 * buffer_size` bytes, and
//! every write of length `<= buffer_size` is mirrored into both halves so a read
//! straddling the wrap point still sees contiguous bytes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::buffer::chunk::BufferChunk;
use crate::buffer::managed::{BufferReturn, ManagedBuffer};
use crate::buffer::shared::{BufferContainer, SharedBuffer};
use crate::dtype::DType;

use super::{BufferManager, BufferManagerArgs};

struct State {
    /// Cumulative bytes ever advertised via `pop()` (monotonic, not wrapped).
    write_pos: u64,
    /// Cumulative bytes ever returned via `push()` (monotonic, not wrapped). The slack
    /// available for new writes is `buffer_size - (write_pos - freed_pos)`.
    freed_pos: u64,
}

pub struct CircularBufferManager {
    buffer_size: usize,
    container: Arc<BufferContainer>,
    state: Mutex<State>,
    self_weak: Weak<CircularBufferManager>,
}

impl CircularBufferManager {
    pub fn new(args: BufferManagerArgs) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let container = match args.node_affinity {
                Some(node) => BufferContainer::with_affinity(args.buffer_size * 2, node),
                None => BufferContainer::new(args.buffer_size * 2),
            };
            CircularBufferManager {
                buffer_size: args.buffer_size,
                container,
                state: Mutex::new(State { write_pos: 0, freed_pos: 0 }),
                self_weak: weak.clone(),
            }
        })
    }

    fn weak_return(&self) -> Weak<dyn BufferReturn> {
        self.self_weak.clone()
    }

    fn slack(&self, state: &State) -> usize {
        self.buffer_size - (state.write_pos - state.freed_pos) as usize
    }
}

impl BufferManager for CircularBufferManager {
    fn empty(&self) -> bool {
        self.slack(&self.state.lock()) == 0
    }

    fn front(&self) -> BufferChunk {
        let state = self.state.lock();
        let slack = self.slack(&state);
        if slack == 0 {
            return BufferChunk::null();
        }
        let offset = (state.write_pos as usize) % self.buffer_size;
        let shared = SharedBuffer::circular(Arc::clone(&self.container), offset, slack);
        BufferChunk::from_shared(shared, DType::uint8())
    }

    fn pop(&self, num_bytes: usize) {
        let mut state = self.state.lock();
        let slack = self.slack(&state);
        assert!(num_bytes <= slack, "circular manager: pop({num_bytes}) exceeds available slack {slack}");
        let start = (state.write_pos as usize) % self.buffer_size;
        state.write_pos += num_bytes as u64;
        drop(state);

        self.container.mirror_circular_write(start, num_bytes, self.buffer_size);

        // A downstream ManagedBuffer representing this span is what eventually calls
        // `return_buffer` once dropped; the caller (the output port) issues it via
        // `issue_managed` and attaches it to the produced chunk, letting normal
        // refcounting drive the eventual `freed_pos` advance.
    }

    fn push(&self, buffer: ManagedBuffer) {
        // `slab_index` is repurposed here to carry the byte length of the span being
        // freed (the circular manager has no discrete slab identity).
        let mut state = self.state.lock();
        state.freed_pos += buffer.slab_index() as u64;
    }

    fn num_buffers(&self) -> usize {
        1
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl BufferReturn for CircularBufferManager {
    fn return_buffer(&self, slab_index: usize, _shared: SharedBuffer) {
        let mut state = self.state.lock();
        state.freed_pos += slab_index as u64;
    }
}

impl CircularBufferManager {
    /// Wrap `num_bytes` produced at the current write position into a `ManagedBuffer`
    /// whose eventual drop frees that span back into the ring. Called by the output
    /// port after `pop()` advances the window.
    pub fn issue_managed(&self, num_bytes: usize) -> ManagedBuffer {
        let offset = {
            let state = self.state.lock();
            ((state.write_pos - num_bytes as u64) as usize) % self.buffer_size
        };
        let shared = SharedBuffer::circular(Arc::clone(&self.container), offset, num_bytes);
        ManagedBuffer::new(shared, num_bytes, self.weak_return())
    }
}
