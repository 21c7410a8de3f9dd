//! `PortInfo`: the purely descriptive half of a port, surfaced to callers that need to
//! enumerate a block's shape without touching live state (topology commit, JSON export,
//! cross-process handshakes).

use crate::dtype::DType;

#[derive(Debug, Clone)]
pub struct PortInfo {
    name: String,
    is_signal_slot: bool,
    dtype: DType,
}

impl PortInfo {
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self { name: name.into(), is_signal_slot: false, dtype }
    }

    pub fn signal_slot(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_signal_slot: true, dtype: DType::uint8() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_signal_slot(&self) -> bool {
        self.is_signal_slot
    }

    pub fn dtype(&self) -> &DType {
        &self.dtype
    }
}
