//! The generic slab buffer manager: `numBuffers` identical `SharedBuffer`s cycling
//! through a ring. Ported from the donor framework's builtin generic manager — the
//! "reuse in place for small consumes, else rotate" policy below is load-bearing and
//! intentionally matches it verbatim (see SPEC_FULL.md §9.1).

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::buffer::chunk::BufferChunk;
use crate::buffer::managed::{BufferReturn, ManagedBuffer};
use crate::buffer::shared::SharedBuffer;
use crate::dtype::DType;

use super::{BufferManager, BufferManagerArgs};

struct State {
    /// Bytes consumed from the current head buffer since it became the head.
    consumed_from_head: usize,
    ready: VecDeque<ManagedBuffer>,
}

pub struct GenericBufferManager {
    buffer_size: usize,
    num_buffers: usize,
    state: Mutex<State>,
    self_weak: Weak<GenericBufferManager>,
}

impl GenericBufferManager {
    pub fn new(args: BufferManagerArgs) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let mgr = GenericBufferManager {
                buffer_size: args.buffer_size,
                num_buffers: args.num_buffers,
                state: Mutex::new(State { consumed_from_head: 0, ready: VecDeque::with_capacity(args.num_buffers) }),
                self_weak: weak.clone(),
            };
            let weak_return: Weak<dyn BufferReturn> = weak.clone();
            let mut state = mgr.state.lock();
            for slab_index in 0..args.num_buffers {
                let shared = match args.node_affinity {
                    Some(node) => SharedBuffer::allocate_with_affinity(args.buffer_size, node),
                    None => SharedBuffer::allocate(args.buffer_size),
                };
                state.ready.push_back(ManagedBuffer::new(shared, slab_index, weak_return.clone()));
            }
            drop(state);
            mgr
        })
    }

    fn weak_return(&self) -> Weak<dyn BufferReturn> {
        self.self_weak.clone()
    }
}

impl BufferManager for GenericBufferManager {
    fn empty(&self) -> bool {
        self.state.lock().ready.is_empty()
    }

    fn front(&self) -> BufferChunk {
        let state = self.state.lock();
        match state.ready.front() {
            Some(managed) => {
                let remaining = self.buffer_size - state.consumed_from_head;
                BufferChunk::from_managed(managed.clone(), DType::uint8())
                    .slice_elements(state.consumed_from_head, remaining)
            }
            None => BufferChunk::null(),
        }
    }

    fn pop(&self, num_bytes: usize) {
        let mut state = self.state.lock();
        assert!(!state.ready.is_empty(), "pop() called on an empty GenericBufferManager");
        state.consumed_from_head += num_bytes;
        if state.consumed_from_head * 2 < self.buffer_size {
            // Reuse the head buffer in place for small consumes.
            return;
        }
        state.consumed_from_head = 0;
        state.ready.pop_front();
    }

    fn push(&self, buffer: ManagedBuffer) {
        let mut state = self.state.lock();
        assert!(state.ready.len() < self.num_buffers, "GenericBufferManager ring overflow");
        state.ready.push_back(buffer);
    }

    fn num_buffers(&self) -> usize {
        self.num_buffers
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl BufferReturn for GenericBufferManager {
    fn return_buffer(&self, slab_index: usize, shared: SharedBuffer) {
        let returned = ManagedBuffer::new(shared, slab_index, self.weak_return());
        BufferManager::push(self, returned);
    }
}
