//! `pothos_core`: the scheduler and buffer plumbing for a streaming dataflow runtime.
//!
//! This crate is deliberately *just* the hard, tightly-coupled middle of such a
//! framework — buffer pools, ports, the per-block actor model, and topology
//! commit/flatten — and not the surrounding ecosystem (plugin loading, a block catalog,
//! individual DSP blocks, a config-file parser). Those are external collaborators; see
//! SPEC_FULL.md §1 for the exact boundary.
//!
//! Module map mirrors SPEC_FULL.md §2: leaf types first (`dtype`, `label`), then buffer
//! plumbing (`buffer`), then the per-block endpoints (`port`), the user-facing unit
//! (`block`), the actor layer that drives it (`actor`), and the graph that wires actors
//! together (`topology`). `config`, `registry`, and `archive` are the ambient surface
//! SPEC_FULL.md §1.1 adds around that core.

pub mod actor;
pub mod archive;
pub mod block;
pub mod buffer;
pub mod config;
pub mod dtype;
pub mod error;
pub mod label;
pub mod port;
pub mod registry;
pub mod testing;
pub mod topology;

pub use actor::{ActorHandle, ActorId, ThreadPool, ThreadPoolArgs};
pub use block::{Block, WorkContext, WorkInfo, WorkStats};
pub use buffer::{
    BufferAccumulator, BufferChunk, BufferManager, BufferManagerArgs, BufferManagerHandle, ManagedBuffer, SharedBuffer,
};
pub use dtype::DType;
pub use error::{PothosError, Result};
pub use label::{Label, LabelIteratorRange};
pub use port::{InputPort, OutputPort, PortInfo};
pub use topology::{Flow, Topology};
