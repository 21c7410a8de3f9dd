//! Fixture blocks used to exercise the scheduler and topology machinery end-to-end:
//! minimal no-op blocks for wiring-only unit tests, plus the feeder/collector/gateway/
//! differential-decoder/preamble-framer/sporadic-dropper blocks the integration suite
//! drives through committed topologies (SPEC_FULL.md §8's concrete scenarios). None of
//! these ship as registered factories — they exist purely as in-tree test fixtures.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::actor::message::Object;
use crate::block::{Block, WorkContext};
use crate::dtype::DType;
use crate::error::Result;
use crate::label::Label;
use crate::port::PortInfo;

/// A block with arbitrary uint8 input/output ports that never does anything in
/// `work()` — useful for `Topology` wiring tests that only care about port shape.
pub struct NullBlock {
    name: String,
    inputs: Vec<PortInfo>,
    outputs: Vec<PortInfo>,
}

impl NullBlock {
    pub fn new(name: impl Into<String>, inputs: Vec<&str>, outputs: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.into_iter().map(|n| PortInfo::new(n, DType::uint8())).collect(),
            outputs: outputs.into_iter().map(|n| PortInfo::new(n, DType::uint8())).collect(),
        }
    }
}

impl Block for NullBlock {
    fn input_port_info(&self) -> Vec<PortInfo> {
        self.inputs.clone()
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        self.outputs.clone()
    }

    fn work(&mut self, _ctx: &mut WorkContext<'_>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Like `NullBlock` but with explicit per-port dtypes, for exercising `commit()`'s dtype
/// compatibility check.
pub struct TypedNullBlock {
    name: String,
    inputs: Vec<PortInfo>,
    outputs: Vec<PortInfo>,
}

impl TypedNullBlock {
    pub fn new(name: impl Into<String>, inputs: Vec<(&str, DType)>, outputs: Vec<(&str, DType)>) -> Self {
        Self {
            name: name.into(),
            inputs: inputs.into_iter().map(|(n, d)| PortInfo::new(n, d)).collect(),
            outputs: outputs.into_iter().map(|(n, d)| PortInfo::new(n, d)).collect(),
        }
    }
}

impl Block for TypedNullBlock {
    fn input_port_info(&self) -> Vec<PortInfo> {
        self.inputs.clone()
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        self.outputs.clone()
    }

    fn work(&mut self, _ctx: &mut WorkContext<'_>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Produces a fixed byte payload (with two labels, "lbl0" at index 3 and "lbl1" at
/// index 5) exactly once, then goes idle. Mirrors the donor test suite's feeder fixture
/// (SPEC_FULL.md §8, scenario 1).
pub struct FeederBlock {
    name: String,
    dtype: DType,
    payload: Vec<u8>,
    produced: bool,
}

impl FeederBlock {
    pub fn new(name: impl Into<String>, dtype: DType, payload: Vec<u8>) -> Self {
        Self { name: name.into(), dtype, payload, produced: false }
    }

    /// The `[0, 1, ..., n-1]` int32 payload scenario 1 feeds through the graph.
    pub fn counting_int32(name: impl Into<String>, n: i32) -> Self {
        let mut payload = Vec::with_capacity(n as usize * 4);
        for i in 0..n {
            payload.extend_from_slice(&i.to_le_bytes());
        }
        Self::new(name, DType::int32(), payload)
    }
}

impl Block for FeederBlock {
    fn input_port_info(&self) -> Vec<PortInfo> {
        Vec::new()
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("out0", self.dtype.clone())]
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        if self.produced {
            return Ok(());
        }
        let elem_size = self.dtype.size().max(1);
        let out_chunk = ctx.output(0).buffer();
        let capacity = out_chunk.len();
        if capacity < self.payload.len() {
            // Manager's buffer is smaller than the whole payload; this fixture only
            // ever feeds short test payloads, so it waits for a bigger one rather than
            // chunking across multiple `work()` calls.
            ctx.yield_self();
            return Ok(());
        }
        out_chunk.as_bytes_mut()[..self.payload.len()].copy_from_slice(&self.payload);
        ctx.output(0).post_label(Label::new("lbl0", (), 3));
        ctx.output(0).post_label(Label::new("lbl1", (), 5));
        let elements = self.payload.len() / elem_size;
        ctx.output(0).produce(elements * elem_size);
        self.produced = true;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Accumulates every byte, label, and message delivered to its one input port into a
/// shared `CollectorState` a test can inspect after `Topology::wait_inactive`.
#[derive(Default)]
pub struct CollectorState {
    pub bytes: Vec<u8>,
    pub labels: Vec<Label>,
    pub messages: Vec<Object>,
}

pub struct CollectorBlock {
    name: String,
    dtype: DType,
    state: Arc<Mutex<CollectorState>>,
}

impl CollectorBlock {
    pub fn new(name: impl Into<String>, dtype: DType) -> (Self, Arc<Mutex<CollectorState>>) {
        let state = Arc::new(Mutex::new(CollectorState::default()));
        (Self { name: name.into(), dtype, state: Arc::clone(&state) }, state)
    }
}

impl Block for CollectorBlock {
    fn input_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("in0", self.dtype.clone())]
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        Vec::new()
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        if let Some(payload) = ctx.input(0).pop_message() {
            self.state.lock().messages.push(payload);
            return Ok(());
        }
        let n = ctx.info().min_elements;
        if n == 0 {
            return Ok(());
        }
        let elem_size = self.dtype.size().max(1);
        let chunk = ctx.input(0).buffer()?.slice_elements(0, n);
        let mut state = self.state.lock();
        let elem_offset = state.bytes.len() / elem_size;
        for label in chunk.labels() {
            state.labels.push(label.clone().with_index(label.index() + elem_offset));
        }
        state.bytes.extend_from_slice(chunk.as_bytes());
        drop(state);
        ctx.input(0).consume(n * elem_size);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Forward,
    Drop,
}

/// Forwards or discards everything it sees, unconditionally, depending on its mode —
/// the simplest possible stand-in for a block whose behavior a topology test wants to
/// toggle without rewiring the graph (SPEC_FULL.md §8, scenarios 1-2).
pub struct GatewayBlock {
    name: String,
    dtype: DType,
    mode: GatewayMode,
}

impl GatewayBlock {
    pub fn new(name: impl Into<String>, dtype: DType, mode: GatewayMode) -> Self {
        Self { name: name.into(), dtype, mode }
    }
}

impl Block for GatewayBlock {
    fn input_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("in0", self.dtype.clone())]
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("out0", self.dtype.clone())]
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        if let Some(payload) = ctx.input(0).pop_message() {
            if self.mode == GatewayMode::Forward {
                ctx.output(0).post_message(payload);
            }
            return Ok(());
        }
        let n = ctx.info().min_elements;
        if n == 0 {
            return Ok(());
        }
        let elem_size = self.dtype.size().max(1);
        if self.mode == GatewayMode::Forward {
            let chunk = ctx.input(0).buffer()?.slice_elements(0, n);
            ctx.output(0).post_buffer(chunk);
        }
        ctx.input(0).consume(n * elem_size);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `out[i] = (in[i] - lastSymRecv + symbols) mod symbols`, updating `lastSymRecv` to
/// `in[i]` after every element — byte-wise differential decoding over a `symbols`-ary
/// alphabet (SPEC_FULL.md §8, scenario 3; §9, "first sample" open question).
pub struct DifferentialDecoder {
    name: String,
    symbols: u8,
    last_sym_recv: u8,
}

impl DifferentialDecoder {
    pub fn new(name: impl Into<String>, symbols: u8) -> Self {
        Self { name: name.into(), symbols, last_sym_recv: 0 }
    }
}

impl Block for DifferentialDecoder {
    fn input_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("in0", DType::uint8())]
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("out0", DType::uint8())]
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        let n = ctx.info().min_elements;
        if n == 0 {
            return Ok(());
        }
        let input_bytes: Vec<u8> = ctx.input(0).buffer()?.slice_elements(0, n).as_bytes().to_vec();
        let out_chunk = ctx.output(0).buffer();
        let out_bytes = out_chunk.as_bytes_mut();
        for (i, &curr) in input_bytes.iter().enumerate() {
            let diff = ((curr as i32 - self.last_sym_recv as i32).rem_euclid(self.symbols as i32)) as u8;
            out_bytes[i] = diff;
            self.last_sym_recv = curr;
        }
        ctx.output(0).produce(n);
        ctx.input(0).consume(n);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Inserts `preamble` verbatim at `start_index` followed by `padding_size` zero bytes,
/// shifting everything from `start_index` onward by `preamble.len() + padding_size` and
/// posting `"myFrameStart"`/`"myFrameEnd"` labels at the new boundary positions
/// (SPEC_FULL.md §8, scenario 4). Assumes the whole frame arrives as one contiguous
/// buffer — this fixture never reassembles a preamble insertion split across calls.
pub struct PreambleFramer {
    name: String,
    preamble: Vec<u8>,
    padding_size: usize,
    start_index: usize,
    end_index: usize,
}

impl PreambleFramer {
    pub fn new(name: impl Into<String>, preamble: Vec<u8>, padding_size: usize, start_index: usize, end_index: usize) -> Self {
        Self { name: name.into(), preamble, padding_size, start_index, end_index }
    }
}

impl Block for PreambleFramer {
    fn input_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("in0", DType::uint8())]
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("out0", DType::uint8())]
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        let n = ctx.info().min_elements;
        if n < self.start_index {
            return Ok(());
        }
        let input = ctx.input(0).buffer()?.slice_elements(0, n);
        let shift = self.preamble.len() + self.padding_size;
        let mut out = Vec::with_capacity(n + shift);
        out.extend_from_slice(&input.as_bytes()[..self.start_index]);
        out.extend_from_slice(&self.preamble);
        out.extend_from_slice(&vec![0u8; self.padding_size]);
        out.extend_from_slice(&input.as_bytes()[self.start_index..]);

        let out_chunk = ctx.output(0).buffer();
        if out_chunk.len() < out.len() {
            // Manager's buffer can't hold the framed output (input + preamble + padding);
            // wait for a bigger one rather than writing past the end of the loan.
            ctx.yield_self();
            return Ok(());
        }
        out_chunk.as_bytes_mut()[..out.len()].copy_from_slice(&out);
        ctx.output(0).post_label(Label::new("myFrameStart", (), self.start_index));
        if self.end_index <= n {
            ctx.output(0).post_label(Label::new("myFrameEnd", (), self.end_index + shift));
        }
        ctx.output(0).produce(out.len());
        ctx.input(0).consume(n);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Drops every buffer and message it sees with probability `probability`, forwarding
/// the rest unchanged (SPEC_FULL.md §8, scenario 5). `0.0`/`1.0` are exact — an internal
/// xorshift64 PRNG only breaks the tie for values strictly between them, so this needs
/// no external randomness dependency for the two scenarios that actually matter.
pub struct SporadicDropper {
    name: String,
    dtype: DType,
    probability: f64,
    rng_state: u64,
}

impl SporadicDropper {
    pub fn new(name: impl Into<String>, dtype: DType, probability: f64, seed: u64) -> Self {
        Self { name: name.into(), dtype, probability, rng_state: seed.max(1) }
    }

    fn should_drop(&mut self) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        if self.probability >= 1.0 {
            return true;
        }
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 7;
        self.rng_state ^= self.rng_state << 17;
        let draw = (self.rng_state >> 11) as f64 / (1u64 << 53) as f64;
        draw < self.probability
    }
}

impl Block for SporadicDropper {
    fn input_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("in0", self.dtype.clone())]
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("out0", self.dtype.clone())]
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        if let Some(payload) = ctx.input(0).pop_message() {
            if !self.should_drop() {
                ctx.output(0).post_message(payload);
            }
            return Ok(());
        }
        let n = ctx.info().min_elements;
        if n == 0 {
            return Ok(());
        }
        let elem_size = self.dtype.size().max(1);
        if !self.should_drop() {
            let chunk = ctx.input(0).buffer()?.slice_elements(0, n);
            ctx.output(0).post_buffer(chunk);
        }
        ctx.input(0).consume(n * elem_size);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differential_decoder_matches_scenario_3() {
        use crate::buffer::manager::{BufferManagerArgs, GenericBufferManager};
        use crate::buffer::BufferChunk;
        use crate::port::{InputPort, OutputPort};

        let mut block = DifferentialDecoder::new("decoder", 2);
        let manager = GenericBufferManager::new(BufferManagerArgs::default());
        let mut inputs = vec![InputPort::new("in0", DType::uint8(), 0)];
        let mut outputs = vec![OutputPort::new("out0", DType::uint8(), manager)];

        let shared = crate::buffer::SharedBuffer::allocate(6);
        shared.as_mut_slice().copy_from_slice(&[0, 1, 1, 0, 1, 1]);
        inputs[0].deliver_buffer(BufferChunk::from_shared(shared, DType::uint8()));

        let info =
            crate::block::WorkInfo { input_elements: vec![6], output_elements: vec![8], min_elements: 6, ..Default::default() };
        let mut ctx = WorkContext::new(&mut inputs, &mut outputs, info);
        block.work(&mut ctx).unwrap();
        drop(ctx);

        assert_eq!(outputs[0].total_elements(), 6);
    }

    #[test]
    fn sporadic_dropper_edge_probabilities_are_deterministic() {
        let mut always_pass = SporadicDropper::new("d", DType::uint8(), 0.0, 42);
        let mut always_drop = SporadicDropper::new("d", DType::uint8(), 1.0, 42);
        for _ in 0..8 {
            assert!(!always_pass.should_drop());
            assert!(always_drop.should_drop());
        }
    }
}
