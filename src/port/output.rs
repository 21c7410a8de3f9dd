//! `OutputPort`: the producer side of a connection, owned exclusively by its
//! `WorkerActor`.
//!
//! Unlike `InputPort`, an output port can have more than one subscriber (a fan-out
//! connection), so every post — `produce`, `postBuffer`, `postMessage` — walks the
//! subscriber list and sends one `ActorMessage::LabeledBuffer`/`AsyncMessage` per
//! downstream actor. Back-pressure is a single credit counter per port (not per
//! subscriber — see SPEC_FULL.md §4.5): it starts at the manager's buffer count,
//! decrements on every post, and is replenished by `Token` messages arriving from
//! whichever subscriber last dropped a `ManagedBuffer`.

use crate::actor::message::{ActorMessage, LabeledBuffer, Object};
use crate::actor::ActorHandle;
use crate::buffer::manager::BufferManagerHandle;
use crate::buffer::BufferChunk;
use crate::dtype::DType;
use crate::label::Label;

use super::info::PortInfo;

struct Subscriber {
    actor: ActorHandle,
    port_index: usize,
}

pub struct OutputPort {
    info: PortInfo,
    manager: BufferManagerHandle,
    /// Labels queued by `postLabel` to ride on the next `produce()`.
    pending_labels: Vec<Label>,
    subscribers: Vec<Subscriber>,
    /// Back-pressure credit: starts at `manager.num_buffers()`, decremented per post,
    /// incremented per `Token` returned from a downstream drop.
    credit: i64,
    total_elements: u64,
    messages_posted: u64,
    /// Buffer domain identity (SPEC_FULL.md §4.3): the manager that backs this port's
    /// production. `Topology::commit` compares this against the downstream input's
    /// domain to decide whether an implicit copy adapter is needed.
    domain: usize,
}

impl OutputPort {
    pub fn new(name: impl Into<String>, dtype: DType, manager: BufferManagerHandle) -> Self {
        let credit = manager.num_buffers() as i64;
        Self {
            info: PortInfo::new(name, dtype),
            manager,
            pending_labels: Vec::new(),
            subscribers: Vec::new(),
            credit,
            total_elements: 0,
            messages_posted: 0,
            domain: 0,
        }
    }

    pub fn with_domain(mut self, domain: usize) -> Self {
        self.domain = domain;
        self
    }

    pub fn domain(&self) -> usize {
        self.domain
    }

    pub fn messages_posted(&self) -> u64 {
        self.messages_posted
    }

    pub fn info(&self) -> &PortInfo {
        &self.info
    }

    pub fn dtype(&self) -> &DType {
        self.info.dtype()
    }

    pub fn manager(&self) -> &BufferManagerHandle {
        &self.manager
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub(crate) fn replace_manager(&mut self, manager: BufferManagerHandle) {
        self.credit = manager.num_buffers() as i64;
        self.manager = manager;
    }

    pub fn subscribe(&mut self, actor: ActorHandle, port_index: usize) {
        self.subscribers.push(Subscriber { actor, port_index });
    }

    pub fn unsubscribe(&mut self, actor_id: crate::actor::ActorId, port_index: usize) {
        self.subscribers.retain(|s| !(s.actor.id() == actor_id && s.port_index == port_index));
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }

    /// Eligibility per SPEC_FULL.md §4.5: ready when the manager has a buffer to draw
    /// from, or a downstream actor has returned enough credit that a post wouldn't
    /// overrun its pool.
    pub fn ready(&self) -> bool {
        !self.manager.empty() || self.credit > 0
    }

    /// A mutable chunk drawn from the manager's front, ready to be written into by the
    /// block's `work()` before calling `produce()`. Null if the manager is empty.
    pub fn buffer(&self) -> BufferChunk {
        self.manager.front()
    }

    pub fn post_label(&mut self, label: Label) {
        self.pending_labels.push(label);
    }

    /// Advance `total_elements`, detach `n` bytes from the manager's front buffer, and
    /// forward them (plus any queued labels) to every subscriber.
    pub fn produce(&mut self, num_bytes: usize) {
        if num_bytes == 0 {
            return;
        }
        let elem_size = self.info.dtype().size().max(1);
        let mut chunk = self.buffer().slice_elements(0, num_bytes / elem_size);
        *chunk.labels_mut() = std::mem::take(&mut self.pending_labels);
        self.manager.pop(num_bytes);
        self.total_elements += (num_bytes / elem_size) as u64;
        self.dispatch(chunk);
    }

    /// Forward an externally-built chunk without drawing from the manager (used by
    /// passthrough/forwarding blocks that hand an upstream chunk straight through).
    pub fn post_buffer(&mut self, mut chunk: BufferChunk) {
        let elem_size = self.info.dtype().size().max(1);
        self.total_elements += (chunk.len() / elem_size) as u64;
        if !self.pending_labels.is_empty() {
            chunk.labels_mut().extend(std::mem::take(&mut self.pending_labels));
        }
        self.dispatch(chunk);
    }

    pub fn post_message(&mut self, payload: Object) {
        self.messages_posted += 1;
        for sub in &self.subscribers {
            sub.actor.send(ActorMessage::AsyncMessage { port_index: sub.port_index, payload: payload.clone() });
        }
    }

    fn dispatch(&mut self, chunk: BufferChunk) {
        self.credit -= 1;
        if self.subscribers.is_empty() {
            return;
        }
        let labels = chunk.labels().to_vec();
        for sub in &self.subscribers {
            sub.actor.send(ActorMessage::LabeledBuffer(LabeledBuffer {
                port_index: sub.port_index,
                chunk: chunk.clone(),
                labels: labels.clone(),
            }));
        }
    }

    pub(crate) fn receive_token(&mut self) {
        self.credit += 1;
    }
}
