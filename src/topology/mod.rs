//! `Topology`: the graph of connections between `(block, portName)` endpoints
//! (SPEC_FULL.md §4.6). Owns the set of `Flow`s it was committed with, supports
//! hierarchical composition via nested child topologies, `flatten()`s to a leaf-only
//! edge set, diffs `commit()`s against the previously committed flattened set, and
//! exports JSON stats matching the donor framework's topology schema (SPEC_FULL.md §6).

mod adapter;
pub mod bridge;

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::actor::{ActorHandle, ActorId, ThreadPool, ThreadPoolArgs};
use crate::block::{Block, WorkStatsSnapshot};
use crate::buffer::manager::{BufferManagerArgs, GenericBufferManager};
use crate::dtype::{self, DType};
use crate::error::{PothosError, Result};
use crate::port::{InputPort, OutputPort, PortInfo};

use adapter::AdapterBlock;

/// One endpoint of a `Flow`: a block id and a port name. `"self"` as the block id
/// references the enclosing hierarchy's own exposed port (SPEC_FULL.md §6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub block: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(block: impl Into<String>, port: impl Into<String>) -> Self {
        Self { block: block.into(), port: port.into() }
    }
}

/// An ordered (source, destination) pair constituting one edge of the topology graph.
/// Hashable so `commit()` can diff an old and a new flow set with plain set arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Flow {
    pub src: Endpoint,
    pub dst: Endpoint,
}

impl Flow {
    pub fn new(src_block: impl Into<String>, src_port: impl Into<String>, dst_block: impl Into<String>, dst_port: impl Into<String>) -> Self {
        Self { src: Endpoint::new(src_block, src_port), dst: Endpoint::new(dst_block, dst_port) }
    }
}

struct BlockEntry {
    actor_id: ActorId,
    handle: ActorHandle,
    inputs: Vec<PortInfo>,
    outputs: Vec<PortInfo>,
    active: bool,
    /// Recorded purely for `to_json()`'s `"blocks"` export; resolving it back to a
    /// constructor is the external block catalog's job (SPEC_FULL.md §1).
    path: Option<String>,
    args: Vec<serde_json::Value>,
    /// `true` for adapter blocks this topology inserted itself at `commit()` time (dtype
    /// conversion or cross-domain copy, SPEC_FULL.md §4.3/§4.7) — excluded from
    /// `to_json()`'s block list since they aren't part of the user's declared graph.
    synthetic: bool,
}

/// The graph of connections between `(block, port)` endpoints, plus its lifecycle.
pub struct Topology {
    flows: HashSet<Flow>,
    committed_flat: HashSet<Flow>,
    blocks: HashMap<String, BlockEntry>,
    children: HashMap<String, Topology>,
    /// Synthetic adapter block name for a flattened edge that needed one, keyed by the
    /// *flattened* `Flow` it bridges — reused across idempotent re-commits instead of
    /// being torn down and rebuilt every time.
    adapters: HashMap<Flow, String>,
    exposed_inputs: HashMap<String, PortInfo>,
    exposed_outputs: HashMap<String, PortInfo>,
    pool: Arc<ThreadPool>,
    global_variables: HashMap<String, serde_json::Value>,
}

impl Topology {
    pub fn new(pool: Arc<ThreadPool>) -> Self {
        Self {
            flows: HashSet::new(),
            committed_flat: HashSet::new(),
            blocks: HashMap::new(),
            children: HashMap::new(),
            adapters: HashMap::new(),
            exposed_inputs: HashMap::new(),
            exposed_outputs: HashMap::new(),
            pool,
            global_variables: HashMap::new(),
        }
    }

    pub fn with_default_pool() -> Self {
        Self::new(ThreadPool::new(ThreadPoolArgs::default()))
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.global_variables.insert(name.into(), value);
    }

    /// Register a leaf block under `name`, spawning its dedicated `WorkerActor`. Output
    /// ports each draw from a freshly allocated generic slab manager unless the block
    /// author wires a different one via `commit()`'s manager-selection rule.
    pub fn add_block(&mut self, name: impl Into<String>, block: Box<dyn Block>, max_timeout_ns: u64) -> Result<()> {
        self.add_block_described(name, block, max_timeout_ns, None, Vec::new())
    }

    pub fn add_block_described(
        &mut self,
        name: impl Into<String>,
        block: Box<dyn Block>,
        max_timeout_ns: u64,
        path: Option<String>,
        args: Vec<serde_json::Value>,
    ) -> Result<()> {
        let name = name.into();
        if self.blocks.contains_key(&name) || self.children.contains_key(&name) {
            return Err(PothosError::configuration(format!("block id '{name}' already registered")));
        }
        let input_infos = block.input_port_info();
        let output_infos = block.output_port_info();
        let inputs: Vec<InputPort> = input_infos.iter().map(|info| InputPort::new(info.name(), info.dtype().clone(), 0)).collect();
        let outputs: Vec<OutputPort> = output_infos
            .iter()
            .map(|info| {
                let manager = GenericBufferManager::new(BufferManagerArgs::default());
                OutputPort::new(info.name(), info.dtype().clone(), manager)
            })
            .collect();

        let (actor_id, handle) = self.pool.spawn(name.clone(), block, inputs, outputs, max_timeout_ns);
        self.blocks.insert(
            name,
            BlockEntry { actor_id, handle, inputs: input_infos, outputs: output_infos, active: false, path, args, synthetic: false },
        );
        Ok(())
    }

    fn add_synthetic_adapter(&mut self, name: String, block: adapter::AdapterBlock) -> (ActorId, ActorHandle) {
        let input_infos = block.input_port_info();
        let output_infos = block.output_port_info();
        let inputs: Vec<InputPort> = input_infos.iter().map(|info| InputPort::new(info.name(), info.dtype().clone(), 0)).collect();
        let outputs: Vec<OutputPort> = output_infos
            .iter()
            .map(|info| {
                let manager = GenericBufferManager::new(BufferManagerArgs::default());
                OutputPort::new(info.name(), info.dtype().clone(), manager)
            })
            .collect();
        let (actor_id, handle) = self.pool.spawn(name.clone(), Box::new(block), inputs, outputs, 1_000_000);
        self.blocks.insert(
            name,
            BlockEntry {
                actor_id,
                handle: handle.clone(),
                inputs: input_infos,
                outputs: output_infos,
                active: false,
                path: None,
                args: Vec::new(),
                synthetic: true,
            },
        );
        (actor_id, handle)
    }

    /// Nest `child` as a hierarchical sub-topology under `name`; its own `"self"`
    /// endpoints are spliced into the parent's flattened graph by `flatten()`.
    pub fn add_child(&mut self, name: impl Into<String>, child: Topology) -> Result<()> {
        let name = name.into();
        if self.blocks.contains_key(&name) || self.children.contains_key(&name) {
            return Err(PothosError::configuration(format!("block id '{name}' already registered")));
        }
        self.children.insert(name, child);
        Ok(())
    }

    pub fn expose_input(&mut self, name: impl Into<String>, dtype: DType) {
        let name = name.into();
        self.exposed_inputs.insert(name.clone(), PortInfo::new(name, dtype));
    }

    pub fn expose_output(&mut self, name: impl Into<String>, dtype: DType) {
        let name = name.into();
        self.exposed_outputs.insert(name.clone(), PortInfo::new(name, dtype));
    }

    fn port_exists(&self, block: &str, port: &str, is_output_side: bool) -> bool {
        if block == "self" {
            return if is_output_side { self.exposed_inputs.contains_key(port) } else { self.exposed_outputs.contains_key(port) };
        }
        if self.children.contains_key(block) {
            // Child port names are only fully validated once flattened.
            return true;
        }
        match self.blocks.get(block) {
            Some(entry) => {
                if is_output_side {
                    entry.outputs.iter().any(|p| p.name() == port)
                } else {
                    entry.inputs.iter().any(|p| p.name() == port)
                }
            }
            None => false,
        }
    }

    pub fn connect(
        &mut self,
        src_block: impl Into<String>,
        src_port: impl Into<String>,
        dst_block: impl Into<String>,
        dst_port: impl Into<String>,
    ) -> Result<()> {
        let flow = Flow::new(src_block, src_port, dst_block, dst_port);
        if !self.port_exists(&flow.src.block, &flow.src.port, true) {
            return Err(PothosError::port_access(&flow.src.port, format!("no such output port on block '{}'", flow.src.block)));
        }
        if !self.port_exists(&flow.dst.block, &flow.dst.port, false) {
            return Err(PothosError::port_access(&flow.dst.port, format!("no such input port on block '{}'", flow.dst.block)));
        }
        self.flows.insert(flow);
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        src_block: impl Into<String>,
        src_port: impl Into<String>,
        dst_block: impl Into<String>,
        dst_port: impl Into<String>,
    ) {
        self.flows.remove(&Flow::new(src_block, src_port, dst_block, dst_port));
    }

    pub fn flows(&self) -> &HashSet<Flow> {
        &self.flows
    }

    /// Resolve the hierarchy down to a flat set of `Flow`s over leaf blocks only,
    /// splicing any edge that touches a child sub-topology's `"self"` boundary
    /// (SPEC_FULL.md §4.6, "Hierarchical topologies").
    pub fn flatten(&self) -> HashSet<Flow> {
        let mut cache: HashMap<String, HashSet<Flow>> = HashMap::new();
        self.flatten_with_cache(&mut cache)
    }

    fn flatten_with_cache(&self, cache: &mut HashMap<String, HashSet<Flow>>) -> HashSet<Flow> {
        for (name, child) in &self.children {
            if !cache.contains_key(name) {
                let flat = child.flatten_with_cache(cache);
                cache.insert(name.clone(), flat);
            }
        }

        let mut out = HashSet::new();
        for (name, _) in &self.children {
            for cf in &cache[name] {
                if cf.src.block != "self" && cf.dst.block != "self" {
                    out.insert(cf.clone());
                }
            }
        }

        for flow in &self.flows {
            let src_child = self.children.contains_key(&flow.src.block);
            let dst_child = self.children.contains_key(&flow.dst.block);
            match (src_child, dst_child) {
                (false, false) => {
                    out.insert(flow.clone());
                }
                (true, false) => {
                    for cf in &cache[&flow.src.block] {
                        if cf.dst.block == "self" && cf.dst.port == flow.src.port {
                            out.insert(Flow { src: cf.src.clone(), dst: flow.dst.clone() });
                        }
                    }
                }
                (false, true) => {
                    for cf in &cache[&flow.dst.block] {
                        if cf.src.block == "self" && cf.src.port == flow.dst.port {
                            out.insert(Flow { src: flow.src.clone(), dst: cf.dst.clone() });
                        }
                    }
                }
                (true, true) => {
                    for sf in &cache[&flow.src.block] {
                        if sf.dst.block != "self" || sf.dst.port != flow.src.port {
                            continue;
                        }
                        for df in &cache[&flow.dst.block] {
                            if df.src.block == "self" && df.src.port == flow.dst.port {
                                out.insert(Flow { src: sf.src.clone(), dst: df.dst.clone() });
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn resolve_actor(&self, block: &str) -> Option<&BlockEntry> {
        self.blocks.get(block)
    }

    fn port_index(&self, block: &str, port: &str, is_output_side: bool) -> Option<usize> {
        let entry = self.blocks.get(block)?;
        if is_output_side {
            entry.outputs.iter().position(|p| p.name() == port)
        } else {
            entry.inputs.iter().position(|p| p.name() == port)
        }
    }

    /// Diff the flattened graph against the last committed flattened graph and apply the
    /// result: tear down removed edges, wire up added edges (inserting a dtype/domain
    /// adapter block when the connected ports need one), then settle lifecycle commands.
    /// No partial commit: every added edge is validated before any actor message is sent
    /// (SPEC_FULL.md §7, `ConfigurationError`/`DTypeMismatch` both abort before mutation).
    pub fn commit(&mut self) -> Result<()> {
        let flat_new = self.flatten();
        let removed: Vec<Flow> = self.committed_flat.difference(&flat_new).cloned().collect();
        let added: Vec<Flow> = flat_new.difference(&self.committed_flat).cloned().collect();

        if removed.is_empty() && added.is_empty() {
            debug!("commit(): no-op, flow set unchanged");
            return Ok(());
        }

        // Pass 1: validate every added edge before touching any actor state.
        struct Resolved {
            flow: Flow,
            needs_adapter: bool,
            adapter_in_dtype: DType,
            adapter_out_dtype: DType,
        }
        let mut resolved = Vec::with_capacity(added.len());
        for flow in &added {
            let src_entry = self
                .resolve_actor(&flow.src.block)
                .ok_or_else(|| PothosError::configuration(format!("unknown source block '{}'", flow.src.block)))?;
            let src_idx = self
                .port_index(&flow.src.block, &flow.src.port, true)
                .ok_or_else(|| PothosError::port_access(&flow.src.port, format!("no such output on '{}'", flow.src.block)))?;
            let dst_entry = self
                .resolve_actor(&flow.dst.block)
                .ok_or_else(|| PothosError::configuration(format!("unknown destination block '{}'", flow.dst.block)))?;
            let dst_idx = self
                .port_index(&flow.dst.block, &flow.dst.port, false)
                .ok_or_else(|| PothosError::port_access(&flow.dst.port, format!("no such input on '{}'", flow.dst.block)))?;

            let src_dtype = src_entry.outputs[src_idx].dtype().clone();
            let dst_dtype = dst_entry.inputs[dst_idx].dtype().clone();
            if src_dtype != dst_dtype && !dtype::compatible(&src_dtype, &dst_dtype) {
                return Err(PothosError::DTypeMismatch { src: src_dtype, dst: dst_dtype });
            }
            let needs_adapter = src_dtype != dst_dtype;
            resolved.push(Resolved { flow: flow.clone(), needs_adapter, adapter_in_dtype: src_dtype, adapter_out_dtype: dst_dtype });
        }

        // Pass 2: tear down removed edges.
        for flow in &removed {
            if let Some(adapter_name) = self.adapters.remove(flow) {
                // Adapter's upstream/downstream wiring is torn down as part of this same
                // removed-edge pass since the adapter's own edges aren't tracked in
                // `committed_flat` separately.
                if let Some(entry) = self.blocks.remove(&adapter_name) {
                    entry.handle.send(crate::actor::message::ActorMessage::Shutdown);
                }
                continue;
            }
            let Some(src_idx) = self.port_index(&flow.src.block, &flow.src.port, true) else { continue };
            let Some(dst_idx) = self.port_index(&flow.dst.block, &flow.dst.port, false) else { continue };
            let Some(dst_entry) = self.blocks.get(&flow.dst.block) else { continue };
            let dst_actor_id = dst_entry.actor_id;
            if let Some(src_entry) = self.blocks.get(&flow.src.block) {
                src_entry.handle.send(crate::actor::message::ActorMessage::Unsubscribe {
                    output_index: src_idx,
                    downstream_actor_id: dst_actor_id,
                    downstream_input_index: dst_idx,
                });
            }
        }

        // Pass 3: wire up added edges, inserting adapters where needed.
        for r in resolved {
            let flow = r.flow;
            if r.needs_adapter {
                let adapter_name = format!("__adapter__{}.{}__{}.{}", flow.src.block, flow.src.port, flow.dst.block, flow.dst.port);
                let adapter_block = AdapterBlock::new(adapter_name.clone(), r.adapter_in_dtype.clone(), r.adapter_out_dtype.clone());
                let (adapter_id, adapter_handle) = self.add_synthetic_adapter(adapter_name.clone(), adapter_block);
                let src_idx = self.port_index(&flow.src.block, &flow.src.port, true).expect("validated above");
                let src_handle = self.blocks[&flow.src.block].handle.clone();
                src_handle.send(crate::actor::message::ActorMessage::Subscribe {
                    output_index: src_idx,
                    downstream: adapter_handle.clone(),
                    downstream_input_index: 0,
                });
                let dst_idx = self.port_index(&flow.dst.block, &flow.dst.port, false).expect("validated above");
                let dst_handle = self.blocks[&flow.dst.block].handle.clone();
                adapter_handle.send(crate::actor::message::ActorMessage::Subscribe {
                    output_index: 0,
                    downstream: dst_handle,
                    downstream_input_index: dst_idx,
                });
                self.adapters.insert(flow.clone(), adapter_name);
                let _ = adapter_id;
            } else {
                let src_idx = self.port_index(&flow.src.block, &flow.src.port, true).expect("validated above");
                let dst_idx = self.port_index(&flow.dst.block, &flow.dst.port, false).expect("validated above");
                let dst_handle = self.blocks[&flow.dst.block].handle.clone();
                self.blocks[&flow.src.block].handle.send(crate::actor::message::ActorMessage::Subscribe {
                    output_index: src_idx,
                    downstream: dst_handle,
                    downstream_input_index: dst_idx,
                });
            }
        }

        self.committed_flat = flat_new.clone();

        // Pass 4: settle lifecycle. An actor is reachable if it appears as either
        // endpoint of the flattened graph, or is an adapter wired in during this commit.
        let mut reachable: HashSet<String> = HashSet::new();
        for flow in &self.committed_flat {
            reachable.insert(flow.src.block.clone());
            reachable.insert(flow.dst.block.clone());
        }
        for name in self.adapters.values() {
            reachable.insert(name.clone());
        }

        let names: Vec<String> = self.blocks.keys().cloned().collect();
        for name in names {
            let entry = self.blocks.get_mut(&name).expect("just listed");
            let should_be_active = !flat_new.is_empty() && reachable.contains(&name);
            if should_be_active && !entry.active {
                entry.handle.send(crate::actor::message::ActorMessage::Activate);
                entry.active = true;
                info!(block = %name, "topology commit: activated");
            } else if !should_be_active && entry.active {
                entry.handle.send(crate::actor::message::ActorMessage::Deactivate);
                entry.active = false;
                info!(block = %name, "topology commit: deactivated");
            }
        }

        Ok(())
    }

    pub fn set_reserve(&self, block: &str, port: &str, bytes: usize) -> Result<()> {
        let entry = self.blocks.get(block).ok_or_else(|| PothosError::configuration(format!("unknown block '{block}'")))?;
        let idx = entry
            .inputs
            .iter()
            .position(|p| p.name() == port)
            .ok_or_else(|| PothosError::port_access(port, format!("no such input on '{block}'")))?;
        entry.handle.send(crate::actor::message::ActorMessage::SetReserve { input_index: idx, bytes });
        Ok(())
    }

    /// `true` once every committed actor has gone idle (no `work()` call) continuously
    /// for `idle`, or `false` if `timeout` elapses first (SPEC_FULL.md §4.6).
    pub fn wait_inactive(&self, idle: Duration, timeout: Duration) -> bool {
        let ids: Vec<ActorId> = self.blocks.values().map(|e| e.actor_id).collect();
        self.pool.wait_inactive(&ids, idle, timeout)
    }

    /// Synchronous per-block stats snapshot via `ActorMessage::StatsRequest`, used to
    /// populate `stats_json()`.
    fn collect_stats(&self) -> HashMap<String, WorkStatsSnapshot> {
        let mut out = HashMap::new();
        for (name, entry) in &self.blocks {
            if entry.synthetic {
                continue;
            }
            let (tx, rx) = channel();
            entry.handle.send(crate::actor::message::ActorMessage::StatsRequest { reply: tx });
            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(snapshot) => {
                    out.insert(name.clone(), snapshot);
                }
                Err(_) => {
                    warn!(block = %name, "stats request timed out or actor already shut down");
                }
            }
        }
        out
    }

    /// JSON stats export: per-block `WorkStats` counters alongside the committed edge
    /// list, matching the shape the donor framework's topology diagnostics surface.
    pub fn stats_json(&self) -> serde_json::Value {
        let stats = self.collect_stats();
        serde_json::json!({
            "blocks": stats.iter().map(|(name, s)| (name.clone(), serde_json::to_value(s).unwrap())).collect::<serde_json::Map<_, _>>(),
            "connections": self.committed_flat.iter().map(|f| serde_json::json!([f.src.block, f.src.port, f.dst.block, f.dst.port])).collect::<Vec<_>>(),
        })
    }

    /// Export this topology's declared (not yet necessarily committed) graph in the
    /// donor's JSON schema (SPEC_FULL.md §6). Block `path`/`args`/`calls` are only as
    /// complete as whatever was supplied via `add_block_described` — resolving a path
    /// back to a live factory stays the external block catalog's job.
    pub fn to_json(&self) -> serde_json::Value {
        let blocks: Vec<serde_json::Value> = self
            .blocks
            .iter()
            .filter(|(_, e)| !e.synthetic)
            .map(|(id, e)| {
                serde_json::json!({
                    "id": id,
                    "path": e.path.clone().unwrap_or_default(),
                    "args": e.args,
                    "calls": Vec::<serde_json::Value>::new(),
                })
            })
            .collect();
        let connections: Vec<serde_json::Value> =
            self.flows.iter().map(|f| serde_json::json!([f.src.block, f.src.port, f.dst.block, f.dst.port])).collect();
        serde_json::json!({
            "blocks": blocks,
            "connections": connections,
            "thread_pools": {},
            "global_variables": self.global_variables,
        })
    }

    /// Parse just the `"connections"` array of a topology JSON document into a flow set
    /// — constructing the `"blocks"` themselves needs the external block catalog
    /// (SPEC_FULL.md §1), so this is the scheduler-core-relevant half of `load()`.
    pub fn connections_from_json(value: &serde_json::Value) -> Result<HashSet<Flow>> {
        let conns = value
            .get("connections")
            .and_then(|v| v.as_array())
            .ok_or_else(|| PothosError::configuration("topology JSON missing 'connections' array"))?;
        let mut flows = HashSet::new();
        for entry in conns {
            let arr = entry
                .as_array()
                .filter(|a| a.len() == 4)
                .ok_or_else(|| PothosError::configuration("malformed connection entry, expected [srcId, srcPort, dstId, dstPort]"))?;
            let as_str = |i: usize| -> Result<String> {
                arr[i].as_str().map(str::to_string).ok_or_else(|| PothosError::configuration("connection entry field is not a string"))
            };
            flows.insert(Flow::new(as_str(0)?, as_str(1)?, as_str(2)?, as_str(3)?));
        }
        Ok(flows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_passes_through_flat_topology_unchanged() {
        let pool = ThreadPool::new(ThreadPoolArgs::default());
        let mut t = Topology::new(pool);
        t.add_block("a", Box::new(crate::testing::NullBlock::new("a", vec![], vec!["out0"])), 0).unwrap();
        t.add_block("b", Box::new(crate::testing::NullBlock::new("b", vec!["in0"], vec![])), 0).unwrap();
        t.connect("a", "out0", "b", "in0").unwrap();
        let flat = t.flatten();
        assert_eq!(flat.len(), 1);
        assert!(flat.contains(&Flow::new("a", "out0", "b", "in0")));
    }

    #[test]
    fn flatten_splices_child_boundary_connections() {
        let pool = ThreadPool::new(ThreadPoolArgs::default());
        let mut child = Topology::new(Arc::clone(&pool));
        child.expose_input("in0", DType::int32());
        child.add_block("inner", Box::new(crate::testing::NullBlock::new("inner", vec!["in0"], vec![])), 0).unwrap();
        child.connect("self", "in0", "inner", "in0").unwrap();

        let mut parent = Topology::new(pool);
        parent.add_block("feeder", Box::new(crate::testing::NullBlock::new("feeder", vec![], vec!["out0"])), 0).unwrap();
        parent.add_child("child", child).unwrap();
        parent.connect("feeder", "out0", "child", "in0").unwrap();

        let flat = parent.flatten();
        assert_eq!(flat.len(), 1);
        assert!(flat.contains(&Flow::new("feeder", "out0", "inner", "in0")));
    }

    #[test]
    fn commit_is_idempotent() {
        let pool = ThreadPool::new(ThreadPoolArgs::default());
        let mut t = Topology::new(pool);
        t.add_block("a", Box::new(crate::testing::NullBlock::new("a", vec![], vec!["out0"])), 0).unwrap();
        t.add_block("b", Box::new(crate::testing::NullBlock::new("b", vec!["in0"], vec![])), 0).unwrap();
        t.connect("a", "out0", "b", "in0").unwrap();
        t.commit().unwrap();
        let before = t.committed_flat.clone();
        t.commit().unwrap();
        assert_eq!(before, t.committed_flat);
    }

    #[test]
    fn commit_rejects_incompatible_dtypes() {
        let pool = ThreadPool::new(ThreadPoolArgs::default());
        let mut t = Topology::new(pool);
        t.add_block("a", Box::new(crate::testing::NullBlock::new("a", vec![], vec!["out0"])), 0).unwrap();
        t.add_block(
            "b",
            Box::new(crate::testing::TypedNullBlock::new("b", vec![("in0", DType::int32())], vec![])),
            0,
        )
        .unwrap();
        // "a"'s out0 defaults to uint8 via NullBlock; "b"'s in0 is int32 with no
        // registered conversion between them (uint8<->int32 isn't a builtin kernel).
        t.connect("a", "out0", "b", "in0").unwrap();
        assert!(matches!(t.commit(), Err(PothosError::DTypeMismatch { .. })));
    }
}
