//! The `BufferManager` capability set — `{empty, front, pop, push}` — and its three
//! variants: generic slab, circular, and custom-allocator.
//!
//! A manager is shared between its owning output port (strong `Arc`) and every
//! in-flight `ManagedBuffer` it has issued (weak, via `BufferReturn`). Physical
//! push/pop of the slab ring is serialized through an internal mutex rather than routed
//! through the actor mailbox: the ring itself is a small leaf structure where a lock is
//! cheap and uncontended in the common case (one owning actor popping, occasional
//! returns from whichever actor last dropped a `ManagedBuffer`). The *scheduling*
//! consequence of a return — "this output port has budget to produce again" — is what
//! actually crosses the actor boundary as a message, and that happens one layer up in
//! `port::output::OutputPort` via token credits (§4.5), not here.

mod circular;
mod custom;
mod slab;

pub use circular::CircularBufferManager;
pub use custom::CustomBufferManager;
pub use slab::GenericBufferManager;

use std::sync::Arc;

use super::chunk::BufferChunk;
use super::managed::{BufferReturn, ManagedBuffer};

/// Construction arguments shared by all manager variants.
#[derive(Debug, Clone)]
pub struct BufferManagerArgs {
    pub buffer_size: usize,
    pub num_buffers: usize,
    pub node_affinity: Option<i32>,
}

impl Default for BufferManagerArgs {
    fn default() -> Self {
        Self { buffer_size: 4096, num_buffers: 8, node_affinity: None }
    }
}

/// The manager capability set. Implementors also implement `BufferReturn` so a
/// `ManagedBuffer`'s final drop can hand its bytes back without knowing which concrete
/// variant issued it.
pub trait BufferManager: BufferReturn {
    /// `true` iff no buffer is currently available for `front()`/production.
    fn empty(&self) -> bool;

    /// The head of the ring, exposed as a writable chunk for the owning output port to
    /// fill. Returns a null chunk when `empty()`.
    fn front(&self) -> BufferChunk;

    /// Advance past `num_bytes` of the front buffer: reuse-in-place for small consumes,
    /// rotate the ring otherwise (see `GenericBufferManager::pop`).
    fn pop(&self, num_bytes: usize);

    /// Accept a returned (or freshly allocated) buffer back into the ring.
    fn push(&self, buffer: ManagedBuffer);

    fn num_buffers(&self) -> usize;

    fn buffer_size(&self) -> usize;
}

/// A shared handle to any manager variant, as stored by `OutputPort`.
pub type BufferManagerHandle = Arc<dyn BufferManager>;
