//! Environment-variable resolution and the `tracing-subscriber` wiring for this crate's
//! side of logging (SPEC_FULL.md §1.1, §6).
//!
//! The donor framework resolves `POTHOS_ROOT`/`POTHOS_PLUGIN_PATH`/`POTHOS_CONF_PATH` and
//! the `POTHOS_LOG_*` trio once per process and treats the result as effectively
//! immutable for the rest of the run; `EnvConfig::current()` mirrors that with a
//! `OnceLock`, so repeated calls (from, say, every `Topology::commit()`) don't re-parse
//! the environment or re-split path lists.

use std::env;
use std::sync::OnceLock;

/// The platform path-list separator used by `POTHOS_PLUGIN_PATH`/`POTHOS_CONF_PATH`:
/// `:` on POSIX, `;` on Windows, per SPEC_FULL.md §6.
#[cfg(windows)]
const PATH_LIST_SEP: char = ';';
#[cfg(not(windows))]
const PATH_LIST_SEP: char = ':';

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub root: Option<String>,
    pub plugin_path: Vec<String>,
    pub conf_path: Vec<String>,
    pub log_level: Option<String>,
    pub log_channel: Option<String>,
    pub log_file: Option<String>,
}

fn split_path_list(raw: &str) -> Vec<String> {
    raw.split(PATH_LIST_SEP).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

impl EnvConfig {
    fn from_process_env() -> Self {
        Self {
            root: env::var("POTHOS_ROOT").ok(),
            plugin_path: env::var("POTHOS_PLUGIN_PATH").map(|v| split_path_list(&v)).unwrap_or_default(),
            conf_path: env::var("POTHOS_CONF_PATH").map(|v| split_path_list(&v)).unwrap_or_default(),
            log_level: env::var("POTHOS_LOG_LEVEL").ok(),
            log_channel: env::var("POTHOS_LOG_CHANNEL").ok(),
            log_file: env::var("POTHOS_LOG_FILE").ok(),
        }
    }

    /// Resolved once per process from the environment; later calls see the same value
    /// even if the environment changes underneath (matches the donor framework's
    /// "read once, publish a root" policy for process-wide state, SPEC_FULL.md §9,
    /// "Global mutable state").
    pub fn current() -> &'static EnvConfig {
        static CONFIG: OnceLock<EnvConfig> = OnceLock::new();
        CONFIG.get_or_init(Self::from_process_env)
    }
}

/// Install a `tracing-subscriber` filter driven by `POTHOS_LOG_LEVEL`, falling back to
/// `info` when unset or unparseable. Idempotent: a second call after a subscriber is
/// already installed is a silent no-op, matching how the donor framework's logging
/// channel setup tolerates being invoked from more than one entry point (a topology
/// built programmatically and one loaded from JSON might both call this).
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let level = EnvConfig::current().log_level.clone().unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_platform_separator() {
        let parts = split_path_list(&format!("a{PATH_LIST_SEP}b{PATH_LIST_SEP}{PATH_LIST_SEP}c"));
        assert_eq!(parts, vec!["a", "b", "c"]);
    }
}
