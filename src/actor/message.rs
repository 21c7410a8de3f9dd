//! The message set carried on a `WorkerActor`'s inbox. Every cross-actor interaction —
//! a produced buffer, a posted object, a returned credit token, lifecycle commands —
//! crosses as one of these rather than a direct method call, so an actor's state is only
//! ever touched from the thread currently draining its own inbox.

use std::any::Any;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::buffer::{BufferChunk, BufferManagerHandle};
use crate::error::Result;
use crate::label::Label;

use super::{ActorHandle, ActorId};

pub type Object = Arc<dyn Any + Send + Sync>;

/// Delivered to a specific input port index on the receiving actor.
pub struct LabeledBuffer {
    pub port_index: usize,
    pub chunk: BufferChunk,
    pub labels: Vec<Label>,
}

pub enum ActorMessage {
    /// A producer's `produce()`/`postBuffer()` delivering sample data (and any labels
    /// riding with it) to one of this actor's input ports.
    LabeledBuffer(LabeledBuffer),
    /// An asynchronous object posted via `postMessage()`.
    AsyncMessage { port_index: usize, payload: Object },
    /// A downstream actor returning back-pressure credit for one of this actor's output
    /// ports, because it dropped a `ManagedBuffer` originally issued by that port's
    /// manager.
    Token { port_index: usize },
    /// A downstream input port advertising its own `BufferManager` to the upstream
    /// output port, so production can draw from the consumer's pool instead of
    /// allocating a separate one (see `Topology::commit`'s manager-selection rule).
    BufferManager { port_index: usize, manager: BufferManagerHandle },
    /// Wake the actor for an eligibility re-check without new port data — how
    /// timer-like blocks advance (`WorkInfo::yield_self`).
    Bump,
    Activate,
    Deactivate,
    Shutdown,
    /// A cross-process or scripting caller invoking a registered method by name.
    OpaqueCall { method: String, args: Vec<Object>, reply: Sender<Result<Object>> },
    /// `Topology::commit()` wiring a new edge: subscribe one of this actor's output
    /// ports to a downstream actor's input port index. Only ever sent by the topology
    /// to the actor that owns the output port, so the subscriber list stays exclusively
    /// actor-owned (SPEC_FULL.md §5, "BufferManagers are mutated only by their owning
    /// output port's actor" — the same rule applies to the subscriber list).
    Subscribe { output_index: usize, downstream: ActorHandle, downstream_input_index: usize },
    /// The mirror of `Subscribe`, sent when `Topology::commit()` diffs away an edge.
    Unsubscribe { output_index: usize, downstream_actor_id: ActorId, downstream_input_index: usize },
    /// `Topology::commit()` propagating a downstream input's `setReserve` to the
    /// upstream actor's matching input port — wait, this sets the *receiving* actor's
    /// own input reserve, since `reserveBytes` is an input-port property read by that
    /// input's own eligibility check.
    SetReserve { input_index: usize, bytes: usize },
    /// A synchronous stats snapshot request, used by `Topology::stats_json()`.
    StatsRequest { reply: Sender<crate::block::WorkStatsSnapshot> },
}
