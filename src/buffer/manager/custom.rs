//! The custom-allocator manager: identical ring discipline to `GenericBufferManager`,
//! but each slab is produced by a caller-supplied allocator instead of the default heap
//! allocation, so blocks backed by pinned, huge-page, or device memory can still plug
//! into the ordinary port/accumulator machinery.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::buffer::chunk::BufferChunk;
use crate::buffer::managed::{BufferReturn, ManagedBuffer};
use crate::buffer::shared::SharedBuffer;
use crate::dtype::DType;

use super::{BufferManager, BufferManagerArgs};

/// The allocator a `CustomBufferManager` calls to back each slab. Boxed rather than
/// generic so the manager type itself stays object-safe and storable as a plain
/// `BufferManagerHandle` alongside the other variants.
pub type CustomAllocator = Box<dyn Fn(&BufferManagerArgs) -> SharedBuffer + Send + Sync>;

struct State {
    consumed_from_head: usize,
    ready: VecDeque<ManagedBuffer>,
}

pub struct CustomBufferManager {
    args: BufferManagerArgs,
    state: Mutex<State>,
    self_weak: Weak<CustomBufferManager>,
}

impl CustomBufferManager {
    /// `allocate` is called once per slab at construction time; its captured state
    /// (an arena, a device handle, whatever backs the returned `SharedBuffer`) must
    /// outlive every buffer it produced, which in practice means it must outlive this
    /// manager — callers typically capture an `Arc` of their own allocator state.
    pub fn new(args: BufferManagerArgs, allocate: CustomAllocator) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let mgr = CustomBufferManager {
                args: args.clone(),
                state: Mutex::new(State { consumed_from_head: 0, ready: VecDeque::with_capacity(args.num_buffers) }),
                self_weak: weak.clone(),
            };
            let weak_return: Weak<dyn BufferReturn> = weak.clone();
            let mut state = mgr.state.lock();
            for slab_index in 0..args.num_buffers {
                let shared = allocate(&args);
                assert_eq!(
                    shared.len(),
                    args.buffer_size,
                    "custom allocator returned a buffer of the wrong size"
                );
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

impl BufferManager for CustomBufferManager {
    fn empty(&self) -> bool {
        self.state.lock().ready.is_empty()
    }

    fn front(&self) -> BufferChunk {
        let state = self.state.lock();
        match state.ready.front() {
            Some(managed) => {
                let remaining = self.args.buffer_size - state.consumed_from_head;
                BufferChunk::from_managed(managed.clone(), DType::uint8())
                    .slice_elements(state.consumed_from_head, remaining)
            }
            None => BufferChunk::null(),
        }
    }

    fn pop(&self, num_bytes: usize) {
        let mut state = self.state.lock();
        assert!(!state.ready.is_empty(), "pop() called on an empty CustomBufferManager");
        state.consumed_from_head += num_bytes;
        if state.consumed_from_head * 2 < self.args.buffer_size {
            return;
        }
        state.consumed_from_head = 0;
        state.ready.pop_front();
    }

    fn push(&self, buffer: ManagedBuffer) {
        let mut state = self.state.lock();
        assert!(state.ready.len() < self.args.num_buffers, "CustomBufferManager ring overflow");
        state.ready.push_back(buffer);
    }

    fn num_buffers(&self) -> usize {
        self.args.num_buffers
    }

    fn buffer_size(&self) -> usize {
        self.args.buffer_size
    }
}

impl BufferReturn for CustomBufferManager {
    fn return_buffer(&self, slab_index: usize, shared: SharedBuffer) {
        let returned = ManagedBuffer::new(shared, slab_index, self.weak_return());
        BufferManager::push(self, returned);
    }
}
