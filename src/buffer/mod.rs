//! Buffer allocation and pooling: `SharedBuffer`, `ManagedBuffer`, `BufferChunk`, the
//! `BufferManager` trait and its slab/circular/custom variants, and `BufferAccumulator`.

pub mod accumulator;
pub mod chunk;
pub mod managed;
pub mod manager;
pub mod shared;

pub use accumulator::BufferAccumulator;
pub use chunk::BufferChunk;
pub use managed::{BufferReturn, ManagedBuffer};
pub use manager::{BufferManager, BufferManagerArgs, BufferManagerHandle};
pub use shared::SharedBuffer;
