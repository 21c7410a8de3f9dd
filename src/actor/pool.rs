//! `ThreadPool`: the shared dispatch that runs `WorkerActor`s, plus the config shape
//! (`ThreadPoolArgs`) the donor framework's topology JSON carries under
//! `"thread_pools"`.
//!
//! Each actor gets its own dedicated OS thread rather than being multiplexed over a
//! fixed-size worker pool: an actor's inbox is already a serial, blocking-recv loop, so
//! a thread-per-actor model gives the same "different actors may execute concurrently,
//! one actor is never re-entered" guarantee (§5) with far less machinery than a real
//! task-stealing scheduler, at the cost of `num_threads` becoming advisory capacity
//! rather than an enforced concurrency cap. `priority` and `affinity_list` are
//! similarly advisory — logged at spawn time, not enforced, since pinning Rust threads
//! to NUMA nodes or CPU sets needs a platform crate this workspace does not otherwise
//! carry (same call as the circular buffer manager's mmap workaround, see
//! SPEC_FULL.md §4.1).

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{next_actor_id, ActorHandle, ActorId};
use crate::block::Block;
use crate::port::{InputPort, OutputPort};

use super::worker::WorkerActor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffinityMode {
    All,
    Numa,
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldMode {
    Cond,
    Hybrid,
    Spin,
}

#[derive(Debug, Clone)]
pub struct ThreadPoolArgs {
    pub num_threads: usize,
    /// Advisory scheduling priority in `[-1, +1]`.
    pub priority: f32,
    pub affinity_mode: AffinityMode,
    pub affinity_list: Vec<i32>,
    pub yield_mode: YieldMode,
}

impl Default for ThreadPoolArgs {
    fn default() -> Self {
        Self {
            num_threads: 1,
            priority: 0.0,
            affinity_mode: AffinityMode::All,
            affinity_list: Vec::new(),
            yield_mode: YieldMode::Cond,
        }
    }
}

/// Tracks, per actor, the timestamp of its last `work()` completion (or registration,
/// if it has never run one) so `Topology::wait_inactive` can poll "every actor idle for
/// N continuous seconds" without each actor maintaining its own condvar.
#[derive(Default)]
pub(crate) struct ActivityTracker {
    last_active: Mutex<HashMap<ActorId, Instant>>,
    cond: Condvar,
}

impl ActivityTracker {
    pub fn register(&self, id: ActorId) {
        self.last_active.lock().unwrap().insert(id, Instant::now());
    }

    pub fn unregister(&self, id: ActorId) {
        self.last_active.lock().unwrap().remove(&id);
    }

    pub fn mark(&self, id: ActorId) {
        let mut map = self.last_active.lock().unwrap();
        map.insert(id, Instant::now());
        drop(map);
        self.cond.notify_all();
    }

    /// `true` once every id in `actor_ids` has gone `idle` continuously, `false` if
    /// `timeout` elapses first. An id with no recorded activity (not currently
    /// registered) counts as idle since the dawn of time.
    pub fn wait_inactive(&self, actor_ids: &[ActorId], idle: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.last_active.lock().unwrap();
        loop {
            let now = Instant::now();
            let all_idle = actor_ids.iter().all(|id| match guard.get(id) {
                Some(last) => now.duration_since(*last) >= idle,
                None => true,
            });
            if all_idle {
                return true;
            }
            let remaining = match deadline.checked_duration_since(now) {
                Some(d) if d > Duration::ZERO => d,
                _ => return false,
            };
            let wait_for = remaining.min(idle.max(Duration::from_millis(1)));
            let (next_guard, _timeout_result) = self.cond.wait_timeout(guard, wait_for).unwrap();
            guard = next_guard;
            if Instant::now() >= deadline {
                let now = Instant::now();
                return actor_ids.iter().all(|id| match guard.get(id) {
                    Some(last) => now.duration_since(*last) >= idle,
                    None => true,
                });
            }
        }
    }
}

pub struct ThreadPool {
    args: ThreadPoolArgs,
    pub(crate) activity: Arc<ActivityTracker>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    pub fn new(args: ThreadPoolArgs) -> Arc<Self> {
        debug!(
            num_threads = args.num_threads,
            priority = args.priority,
            yield_mode = ?args.yield_mode,
            affinity_mode = ?args.affinity_mode,
            "thread pool created"
        );
        Arc::new(Self { args, activity: Arc::new(ActivityTracker::default()), handles: Mutex::new(Vec::new()) })
    }

    pub fn args(&self) -> &ThreadPoolArgs {
        &self.args
    }

    /// Build and spawn a `WorkerActor` for `block`, returning a handle other ports can
    /// post messages to. The actor's thread runs until it processes `Shutdown`.
    pub fn spawn(
        self: &Arc<Self>,
        name: impl Into<String>,
        block: Box<dyn Block>,
        inputs: Vec<InputPort>,
        outputs: Vec<OutputPort>,
        max_timeout_ns: u64,
    ) -> (ActorId, ActorHandle) {
        let id = next_actor_id();
        let name = name.into();
        let (actor, handle) = WorkerActor::new(id, name.clone(), block, inputs, outputs, max_timeout_ns);
        self.activity.register(id);

        let activity = Arc::clone(&self.activity);
        let pool_name = name.clone();
        let join = std::thread::Builder::new()
            .name(format!("pothos-actor-{id}"))
            .spawn(move || {
                debug!(actor = %pool_name, "actor thread starting");
                actor.run(activity);
                debug!(actor = %pool_name, "actor thread exiting");
            })
            .expect("failed to spawn actor thread");
        self.handles.lock().unwrap().push(join);
        (id, handle)
    }

    pub fn wait_inactive(&self, actor_ids: &[ActorId], idle: Duration, timeout: Duration) -> bool {
        self.activity.wait_inactive(actor_ids, idle, timeout)
    }

    /// Block until every spawned actor thread has exited. Intended for orderly test
    /// teardown after every actor has received `Shutdown`.
    pub fn join_all(&self) {
        let mut handles = self.handles.lock().unwrap();
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}
