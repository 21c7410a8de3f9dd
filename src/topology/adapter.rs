//! The inline conversion block `Topology::commit()` splices into a flattened edge
//! whenever the two connected ports disagree on dtype (SPEC_FULL.md §4.7). Never
//! constructed directly by a topology's own declared graph — only by `commit()` itself,
//! and torn down again the moment the edge it bridges is removed.
//!
//! Domain-mismatch copies (SPEC_FULL.md's "domains differ on a connection" rule) are not
//! separately inserted here: every port this implementation constructs gets buffer
//! domain `0` (DESIGN.md records this as a deliberate scope cut — nothing in
//! `Topology::add_block` yet exposes a way to request a non-default domain), so the
//! dtype-mismatch path above is the only adapter this commit ever needs.

use crate::block::{Block, WorkContext};
use crate::dtype::DType;
use crate::error::Result;
use crate::port::PortInfo;

pub struct AdapterBlock {
    name: String,
    in_dtype: DType,
    out_dtype: DType,
}

impl AdapterBlock {
    pub fn new(name: String, in_dtype: DType, out_dtype: DType) -> Self {
        Self { name, in_dtype, out_dtype }
    }
}

impl Block for AdapterBlock {
    fn input_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("in0", self.in_dtype.clone())]
    }

    fn output_port_info(&self) -> Vec<PortInfo> {
        vec![PortInfo::new("out0", self.out_dtype.clone())]
    }

    fn work(&mut self, ctx: &mut WorkContext<'_>) -> Result<()> {
        let n = ctx.info().min_elements;
        if n == 0 {
            if let Some(payload) = ctx.input(0).pop_message() {
                ctx.output(0).post_message(payload);
            }
            return Ok(());
        }
        let elem_size = self.in_dtype.size().max(1);
        let front = ctx.input(0).buffer()?.slice_elements(0, n);
        let converted = front.convert(&self.out_dtype)?;
        ctx.output(0).post_buffer(converted);
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
    use crate::buffer::BufferChunk;
    use crate::port::{InputPort, OutputPort};

    #[test]
    fn converts_float32_to_complex_float32() {
        let mut block = AdapterBlock::new("adapter".into(), DType::float32(), DType::complex_float32());
        let manager = crate::buffer::manager::GenericBufferManager::new(crate::buffer::manager::BufferManagerArgs::default());
        let mut inputs = vec![InputPort::new("in0", DType::float32(), 0)];
        let mut outputs = vec![OutputPort::new("out0", DType::complex_float32(), manager)];

        let shared = crate::buffer::SharedBuffer::allocate(8);
        shared.as_mut_slice().copy_from_slice(&1.5f32.to_le_bytes().iter().chain(2.5f32.to_le_bytes().iter()).copied().collect::<Vec<u8>>());
        let chunk = BufferChunk::from_shared(shared, DType::float32());
        inputs[0].deliver_buffer(chunk);

        let info = crate::block::WorkInfo { input_elements: vec![2], output_elements: vec![0], min_elements: 2, ..Default::default() };
        let mut ctx = WorkContext::new(&mut inputs, &mut outputs, info);
        block.work(&mut ctx).unwrap();
        assert_eq!(outputs[0].total_elements(), 2);
    }
}
