//! The actor layer: one `WorkerActor` per block, message-passing between them, and the
//! `ThreadPool` runtime that drives eligible actors.

pub mod message;
pub mod pool;
pub mod worker;

pub use message::ActorMessage;
pub use pool::{AffinityMode, ThreadPool, ThreadPoolArgs, YieldMode};
pub use worker::WorkerActor;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

/// Process-wide monotonic actor identity, used as the credit key in an output port's
/// per-subscriber token table and as the stable id in topology diagnostics.
pub type ActorId = u64;

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_actor_id() -> ActorId {
    NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed)
}

/// A lightweight, cloneable handle to an actor's inbox — what an `OutputPort`'s
/// subscriber list and the `Topology` both hold instead of the actor itself.
#[derive(Clone)]
pub struct ActorHandle {
    id: ActorId,
    sender: Sender<ActorMessage>,
}

impl ActorHandle {
    pub fn new(id: ActorId, sender: Sender<ActorMessage>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Best-effort post: a disconnected inbox means the actor has already shut down and
    /// drained, which is the same "silently dropped" outcome `PothosError::ShutdownPending`
    /// documents — the caller never needs to retry or escalate it.
    pub fn send(&self, message: ActorMessage) {
        let _ = self.sender.send(message);
    }
}

impl std::fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorHandle").field("id", &self.id).finish()
    }
}
