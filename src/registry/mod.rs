//! Descriptive, out-of-process-loader surface the scheduler core still needs to
//! recognize: `PluginPath` syntax and the `PothosDoc` block-description markup
//! (SPEC_FULL.md §2.1, §6). The plugin registry and block catalog that actually resolve
//! a path or description to a running block are external collaborators (SPEC_FULL.md
//! §1) — this module stops at "parse it, validate it".

pub mod block_description;
pub mod plugin_path;

pub use block_description::{parse_doc_block, BlockDescription, FactorySpec, ParamDescription, SetterSpec, WidgetSpec};
pub use plugin_path::PluginPath;
