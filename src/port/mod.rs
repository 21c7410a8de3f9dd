//! Per-block port endpoints: `InputPort` (consumer) and `OutputPort` (producer), plus
//! the purely descriptive `PortInfo` shared by both.

pub mod info;
pub mod input;
pub mod output;

pub use info::PortInfo;
pub use input::InputPort;
pub use output::OutputPort;
