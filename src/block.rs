//! `Block`: the user-facing processing unit, and the `WorkContext`/`WorkInfo`/`WorkStats`
//! surface a block's `work()` implementation sees on every invocation.
//!
//! A `Block` is a value implementing a capability set rather than a point in a class
//! hierarchy (SPEC_FULL.md §9, "Deep polymorphism of blocks") — registered factories
//! produce `Box<dyn Block>` values that the runtime holds behind this one trait object,
//! the same shape the donor framework's own `ProcessingBlock` surface takes.

use std::time::{Duration, Instant};

use crate::actor::message::Object;
use crate::error::Result;
use crate::port::{InputPort, OutputPort, PortInfo};

/// Snapshot recomputed before every `work()` call: per-port element counts and the
/// cooperative sleep ceiling. `min_elements` is the minimum across every *indexed*
/// port — the natural "how much can I process this call" figure most blocks key off.
#[derive(Debug, Clone, Default)]
pub struct WorkInfo {
    pub input_elements: Vec<usize>,
    pub output_elements: Vec<usize>,
    pub min_elements: usize,
    pub min_in_elements: usize,
    pub min_out_elements: usize,
    pub min_all_elements: usize,
    pub min_all_in_elements: usize,
    pub min_all_out_elements: usize,
    pub max_timeout_ns: u64,
}

/// Monotonically growing counters for one block's actor, surfaced to `Topology`'s JSON
/// stats export and to the panic/error-recording path in `actor::worker`.
#[derive(Debug, Default)]
pub struct WorkStats {
    pub bytes_consumed: u64,
    pub bytes_produced: u64,
    pub msgs_consumed: u64,
    pub msgs_produced: u64,
    pub num_work_calls: u64,
    pub num_work_errors: u64,
    pub total_time_work_ns: u64,
    pub total_time_pre_work_ns: u64,
    pub total_time_post_work_ns: u64,
    pub last_active: Option<Instant>,
}

impl WorkStats {
    pub fn record_work(&mut self, elapsed: Duration) {
        self.num_work_calls += 1;
        self.total_time_work_ns += elapsed.as_nanos() as u64;
        self.last_active = Some(Instant::now());
    }

    pub fn record_error(&mut self) {
        self.num_work_errors += 1;
    }

    /// A plain, `Send`-able snapshot for `Topology::stats_json()` — `WorkStats` itself
    /// carries an `Instant`, which doesn't serialize, so the actor converts it to this
    /// on request rather than exposing its live counters directly.
    pub fn snapshot(&self) -> WorkStatsSnapshot {
        WorkStatsSnapshot {
            bytes_consumed: self.bytes_consumed,
            bytes_produced: self.bytes_produced,
            msgs_consumed: self.msgs_consumed,
            msgs_produced: self.msgs_produced,
            num_work_calls: self.num_work_calls,
            num_work_errors: self.num_work_errors,
            total_time_work_ns: self.total_time_work_ns,
            total_time_pre_work_ns: self.total_time_pre_work_ns,
            total_time_post_work_ns: self.total_time_post_work_ns,
        }
    }
}

/// `WorkStats`, minus the non-serializable `Instant`, for crossing the actor boundary
/// via `ActorMessage::StatsRequest` and landing in `Topology::stats_json()`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkStatsSnapshot {
    pub bytes_consumed: u64,
    pub bytes_produced: u64,
    pub msgs_consumed: u64,
    pub msgs_produced: u64,
    pub num_work_calls: u64,
    pub num_work_errors: u64,
    pub total_time_work_ns: u64,
    pub total_time_pre_work_ns: u64,
    pub total_time_post_work_ns: u64,
}

/// The mutable view a block's `work()` receives: its own ports (indexed, in declaration
/// order) and the `WorkInfo` computed immediately before this call.
pub struct WorkContext<'a> {
    inputs: &'a mut [InputPort],
    outputs: &'a mut [OutputPort],
    info: WorkInfo,
    yield_requested: bool,
}

impl<'a> WorkContext<'a> {
    pub(crate) fn new(inputs: &'a mut [InputPort], outputs: &'a mut [OutputPort], info: WorkInfo) -> Self {
        Self { inputs, outputs, info, yield_requested: false }
    }

    pub fn info(&self) -> &WorkInfo {
        &self.info
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn input(&mut self, index: usize) -> &mut InputPort {
        &mut self.inputs[index]
    }

    pub fn output(&mut self, index: usize) -> &mut OutputPort {
        &mut self.outputs[index]
    }

    pub fn input_by_name(&mut self, name: &str) -> Option<&mut InputPort> {
        self.inputs.iter_mut().find(|p| p.info().name() == name)
    }

    pub fn output_by_name(&mut self, name: &str) -> Option<&mut OutputPort> {
        self.outputs.iter_mut().find(|p| p.info().name() == name)
    }

    /// Request a re-evaluation of this block's eligibility without having consumed or
    /// produced anything — how timer/signal blocks advance (SPEC_FULL.md §4.5, "yield
    /// hint"). The actor posts a `Bump` to itself once this `work()` call returns.
    pub fn yield_self(&mut self) {
        self.yield_requested = true;
    }

    pub(crate) fn take_yield_requested(&mut self) -> bool {
        std::mem::replace(&mut self.yield_requested, false)
    }
}

/// The block capability set: port descriptions, the lifecycle hooks, and an opaque
/// call surface for cross-process/scripting callers (SPEC_FULL.md §9,
/// "Typed-callable/proxy system"). Implementors are owned exclusively by one
/// `WorkerActor` once registered with a `Topology`.
pub trait Block: Send {
    fn input_port_info(&self) -> Vec<PortInfo>;
    fn output_port_info(&self) -> Vec<PortInfo>;

    /// Called once when the actor transitions from inactive to active. Default is a
    /// no-op; blocks that need to reset internal state (e.g. re-arm a timer) override it.
    fn activate(&mut self) -> Result<()> {
        Ok(())
    }

    /// The block's single unit of work. Must not block indefinitely — it may sleep up
    /// to `ctx.info().max_timeout_ns`, honored cooperatively by the actor loop, not
    /// preemptively.
    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()>;

    /// Called once when the actor transitions to deactivated, after any in-flight
    /// `work()` call returns.
    fn deactivate(&mut self) -> Result<()> {
        Ok(())
    }

    /// Invoke a registered method by name with opaque arguments, for cross-process or
    /// scripting callers (`ActorMessage::OpaqueCall`). Default: no methods registered.
    fn opaque_call(&mut self, method: &str, _args: &[Object]) -> Result<Object> {
        Err(crate::error::PothosError::port_access(method, "no such registered call on this block"))
    }

    /// Name used in logging spans and topology diagnostics. Defaults to the Rust type
    /// name, which is rarely what a user wants — block factories normally override this
    /// with the id assigned in the topology JSON.
    fn name(&self) -> &str {
        "block"
    }
}
