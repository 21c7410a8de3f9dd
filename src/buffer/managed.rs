//! `ManagedBuffer`: a `SharedBuffer` borrowed from a `BufferManager`.
//!
//! Ownership here is the one genuinely tricky cycle in the whole crate: the manager
//! hands out buffers it wants back, but the buffer must not hold a strong reference to
//! the manager (that would keep the manager alive forever). The resolution is: strong
//! ownership of the bytes by whoever holds the `ManagedBuffer`, and a *weak* reference
//! back to the manager so `Drop` can call `BufferReturn::return_buffer` directly from
//! whatever thread drops the last handle, without needing the manager to still be
//! alive (DESIGN.md records this as the scope cut against the `Token`-message return
//! path `ActorMessage::Token` was originally meant to carry — the manager's own ring is
//! updated synchronously here, and only the output port's back-pressure bookkeeping
//! would need the message, which is a separate scheduling concern from the memory's
//! own lifecycle).

use std::sync::{Arc, Weak};

use super::shared::SharedBuffer;

/// Anything a `ManagedBuffer` can be returned to. Implemented by the buffer manager
/// variants in `buffer::manager`. Kept as a trait (rather than a concrete type) so the
/// return path doesn't need to know which manager flavor it's talking to.
pub trait BufferReturn: Send + Sync {
    /// Push a buffer back into the pool it was issued from, identified by its slab index.
    fn return_buffer(&self, slab_index: usize, shared: SharedBuffer);
}

struct Inner {
    shared: SharedBuffer,
    slab_index: usize,
    manager: Weak<dyn BufferReturn>,
}

/// A reference-counted handle to a buffer on loan from a `BufferManager`. Cloning a
/// `ManagedBuffer` increments the same reference count used to decide when the buffer
/// can be returned — there is exactly one manager per managed buffer for its lifetime,
/// recorded as a weak reference so a manager can be torn down while buffers it issued
/// are still in flight (in which case the memory is simply freed instead of recycled).
#[derive(Clone)]
pub struct ManagedBuffer {
    inner: Arc<Inner>,
}

impl ManagedBuffer {
    pub fn new(shared: SharedBuffer, slab_index: usize, manager: Weak<dyn BufferReturn>) -> Self {
        Self { inner: Arc::new(Inner { shared, slab_index, manager }) }
    }

    pub fn shared(&self) -> &SharedBuffer {
        &self.inner.shared
    }

    pub fn slab_index(&self) -> usize {
        self.inner.slab_index
    }

    /// Number of live handles to this exact buffer loan (including this one).
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.return_buffer(self.slab_index, self.shared.clone());
        }
        // Manager gone: the SharedBuffer's own Arc<BufferContainer> drop frees the memory.
    }
}
