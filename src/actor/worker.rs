//! `WorkerActor`: the per-block actor that owns a block's port state, drains its
//! inbox, decides eligibility, and invokes `work()` (SPEC_FULL.md §4.5).

use std::panic::AssertUnwindSafe;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, span, warn, Level};

use super::message::{ActorMessage, LabeledBuffer};
use super::pool::ActivityTracker;
use super::{ActorHandle, ActorId};
use crate::block::{Block, WorkContext, WorkInfo, WorkStats};
use crate::port::{InputPort, OutputPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActorState {
    Inactive,
    Active,
    ShuttingDown,
    ShutDown,
}

pub struct WorkerActor {
    id: ActorId,
    name: String,
    block: Box<dyn Block>,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    inbox: Receiver<ActorMessage>,
    self_handle: ActorHandle,
    state: ActorState,
    stats: WorkStats,
    max_timeout_ns: u64,
}

impl WorkerActor {
    pub fn new(
        id: ActorId,
        name: String,
        block: Box<dyn Block>,
        inputs: Vec<InputPort>,
        outputs: Vec<OutputPort>,
        max_timeout_ns: u64,
    ) -> (Self, ActorHandle) {
        let (tx, rx) = channel();
        let handle = ActorHandle::new(id, tx);
        let actor = Self {
            id,
            name,
            block,
            inputs,
            outputs,
            inbox: rx,
            self_handle: handle.clone(),
            state: ActorState::Inactive,
            stats: WorkStats::default(),
            max_timeout_ns,
        };
        (actor, handle)
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn stats(&self) -> &WorkStats {
        &self.stats
    }

    /// Drive this actor's loop until it processes `Shutdown` and drains whatever else
    /// was already queued, or its inbox disconnects (every sender handle dropped).
    /// `activity` is marked on registration-equivalent events so `Topology::wait_inactive`
    /// can observe idle actors without polling each one directly.
    pub fn run(mut self, activity: Arc<ActivityTracker>) {
        let span = span!(Level::DEBUG, "actor", block = %self.name, id = self.id);
        let _enter = span.enter();

        loop {
            // Drain everything currently queued before deciding eligibility, so a burst
            // of upstream posts is reflected in a single eligibility check rather than
            // one `work()` call per message.
            let mut drained_any = false;
            loop {
                match self.inbox.try_recv() {
                    Ok(msg) => {
                        self.handle_message(msg);
                        drained_any = true;
                    }
                    Err(_) => break,
                }
            }
            if drained_any {
                activity.mark(self.id);
            }

            if self.state == ActorState::ShutDown {
                break;
            }

            if self.state == ActorState::Active && self.eligible() {
                if self.invoke_work() {
                    activity.mark(self.id);
                    continue;
                }
                // `eligible()` only checks port capacity, not whether there was anything
                // to do; a call that moved no bytes, produced no messages, and didn't ask
                // to be re-woken is a no-op tick. Falling through to the timed wait below
                // (rather than marking activity and spinning) is what lets a block settle
                // into a genuinely idle state once it has drained everything upstream.
            }

            let timeout = if self.max_timeout_ns == 0 {
                Duration::from_millis(50)
            } else {
                Duration::from_nanos(self.max_timeout_ns).min(Duration::from_millis(50))
            };
            match self.inbox.recv_timeout(timeout) {
                Ok(msg) => {
                    self.handle_message(msg);
                    activity.mark(self.id);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        activity.unregister(self.id);
        info!(block = %self.name, "actor shut down");
    }

    fn handle_message(&mut self, message: ActorMessage) {
        match message {
            ActorMessage::LabeledBuffer(LabeledBuffer { port_index, mut chunk, labels }) => {
                if port_index >= self.inputs.len() {
                    warn!(block = %self.name, port_index, "labeled buffer for unknown input port dropped");
                    return;
                }
                if !labels.is_empty() {
                    chunk.labels_mut().extend(labels);
                }
                self.inputs[port_index].deliver_buffer(chunk);
            }
            ActorMessage::AsyncMessage { port_index, payload } => {
                if port_index >= self.inputs.len() {
                    warn!(block = %self.name, port_index, "async message for unknown input port dropped");
                    return;
                }
                self.stats.msgs_consumed += 1;
                self.inputs[port_index].deliver_message(payload);
            }
            ActorMessage::Token { port_index } => {
                if let Some(output) = self.outputs.get_mut(port_index) {
                    output.receive_token();
                }
            }
            ActorMessage::BufferManager { port_index, manager } => {
                if let Some(output) = self.outputs.get_mut(port_index) {
                    output.replace_manager(manager);
                }
            }
            ActorMessage::Bump => {}
            ActorMessage::Activate => {
                if self.state == ActorState::Inactive {
                    if let Err(err) = self.block.activate() {
                        error!(block = %self.name, %err, "activate() failed");
                    }
                    self.state = ActorState::Active;
                    info!(block = %self.name, "activated");
                }
            }
            ActorMessage::Deactivate => {
                if self.state == ActorState::Active {
                    if let Err(err) = self.block.deactivate() {
                        error!(block = %self.name, %err, "deactivate() failed");
                    }
                    self.state = ActorState::Inactive;
                    info!(block = %self.name, "deactivated");
                }
            }
            ActorMessage::Shutdown => {
                if self.state == ActorState::Active {
                    let _ = self.block.deactivate();
                }
                self.state = ActorState::ShutDown;
            }
            ActorMessage::OpaqueCall { method, args, reply } => {
                if self.state == ActorState::ShutDown {
                    let _ = reply.send(Err(crate::error::PothosError::ShutdownPending { actor: self.name.clone() }));
                    return;
                }
                let result = self.block.opaque_call(&method, &args);
                let _ = reply.send(result);
            }
            ActorMessage::Subscribe { output_index, downstream, downstream_input_index } => {
                if let Some(output) = self.outputs.get_mut(output_index) {
                    output.subscribe(downstream, downstream_input_index);
                }
            }
            ActorMessage::Unsubscribe { output_index, downstream_actor_id, downstream_input_index } => {
                if let Some(output) = self.outputs.get_mut(output_index) {
                    output.unsubscribe(downstream_actor_id, downstream_input_index);
                }
            }
            ActorMessage::SetReserve { input_index, bytes } => {
                if let Some(input) = self.inputs.get_mut(input_index) {
                    input.set_reserve(bytes);
                }
            }
            ActorMessage::StatsRequest { reply } => {
                let _ = reply.send(self.stats.snapshot());
            }
        }
    }

    fn eligible(&self) -> bool {
        if self.state != ActorState::Active {
            return false;
        }
        let inputs_ready = self
            .inputs
            .iter()
            .all(|p| p.bytes_available() as usize >= p.reserve() || p.has_message());
        let outputs_ready = self.outputs.iter().all(|p| p.ready());
        inputs_ready && outputs_ready
    }

    fn compute_work_info(&self) -> WorkInfo {
        let input_elements: Vec<usize> = self
            .inputs
            .iter()
            .map(|p| {
                let elem_size = p.dtype().size().max(1);
                (p.bytes_available() as usize) / elem_size
            })
            .collect();
        let output_elements: Vec<usize> = self.outputs.iter().map(|p| p.buffer().elements()).collect();

        let min_in = input_elements.iter().copied().min().unwrap_or(0);
        let min_out = output_elements.iter().copied().min().unwrap_or(0);
        let min_all = if input_elements.is_empty() {
            min_out
        } else if output_elements.is_empty() {
            min_in
        } else {
            min_in.min(min_out)
        };

        WorkInfo {
            input_elements,
            output_elements,
            min_elements: min_all,
            min_in_elements: min_in,
            min_out_elements: min_out,
            // This implementation has no separate "named-only, not numerically indexed"
            // port addressing mode (DESIGN.md), so the *_all_* variants coincide with
            // their indexed counterparts.
            min_all_elements: min_all,
            min_all_in_elements: min_in,
            min_all_out_elements: min_out,
            max_timeout_ns: self.max_timeout_ns,
        }
    }

    /// Runs one `work()` call and reports whether it actually moved anything — bytes
    /// consumed or produced, a message posted, or a yield request. `eligible()` gates on
    /// port capacity alone, so a call can legitimately do nothing (e.g. a source block
    /// that already produced its one shot); the caller uses this to decide whether the
    /// actor just made progress worth immediately rechecking, or should fall back to
    /// waiting on its inbox.
    fn invoke_work(&mut self) -> bool {
        let pre_start = Instant::now();
        let info = self.compute_work_info();
        self.stats.total_time_pre_work_ns += pre_start.elapsed().as_nanos() as u64;

        let bytes_in_before = self.total_input_bytes();
        let bytes_out_before = self.total_output_bytes();
        let msgs_out_before: u64 = self.outputs.iter().map(|p| p.messages_posted()).sum();

        let work_start = Instant::now();
        let mut ctx = WorkContext::new(&mut self.inputs, &mut self.outputs, info);
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| self.block.work(&mut ctx)));
        let yield_requested = ctx.take_yield_requested();
        drop(ctx);
        let elapsed = work_start.elapsed();

        let errored = match result {
            Ok(Ok(())) => {
                self.stats.record_work(elapsed);
                false
            }
            Ok(Err(err)) => {
                error!(block = %self.name, %err, "work() returned an error");
                self.stats.record_error();
                self.stats.record_work(elapsed);
                true
            }
            Err(panic) => {
                let message = panic_message(&panic);
                error!(block = %self.name, message = %message, "work() panicked");
                self.stats.record_error();
                self.stats.record_work(elapsed);
                true
            }
        };

        let post_start = Instant::now();
        let bytes_in_after = self.total_input_bytes();
        let bytes_out_after = self.total_output_bytes();
        let msgs_out_after: u64 = self.outputs.iter().map(|p| p.messages_posted()).sum();
        let consumed = bytes_in_after.saturating_sub(bytes_in_before);
        let produced = bytes_out_after.saturating_sub(bytes_out_before);
        let msgs = msgs_out_after.saturating_sub(msgs_out_before);
        self.stats.bytes_consumed += consumed;
        self.stats.bytes_produced += produced;
        self.stats.msgs_produced += msgs;
        self.stats.total_time_post_work_ns += post_start.elapsed().as_nanos() as u64;

        if yield_requested {
            self.self_handle.send(ActorMessage::Bump);
        }

        consumed > 0 || produced > 0 || msgs > 0 || yield_requested || errored
    }

    fn total_input_bytes(&self) -> u64 {
        self.inputs.iter().map(|p| p.total_elements() * p.dtype().size().max(1) as u64).sum()
    }

    fn total_output_bytes(&self) -> u64 {
        self.outputs.iter().map(|p| p.total_elements() * p.dtype().size().max(1) as u64).sum()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
