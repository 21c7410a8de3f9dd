//! `PluginPath`: parsing and validation of the absolute, UNIX-like path syntax used by
//! topology JSON factory references and block registration (SPEC_FULL.md §6).
//!
//! The plugin registry and dynamic module loader that actually *resolves* a path to a
//! constructor are out of scope (SPEC_FULL.md §1) — this module only owns the syntax,
//! since `Topology::commit()` validates factory paths against it before handing off to
//! whatever external catalog is wired in.

use crate::error::{PothosError, Result};

/// A validated absolute plugin path: `/` followed by zero or more `[A-Za-z0-9_-]+`
/// segments separated by `/`. The root path `/` itself has zero segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PluginPath {
    segments: Vec<String>,
}

fn segment_is_valid(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl PluginPath {
    /// Parse and validate. Fails with `PothosError::Configuration` on anything that
    /// isn't `/`-rooted, carries an empty segment, or has a segment outside
    /// `[A-Za-z0-9_-]+`.
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix('/')
            .ok_or_else(|| PothosError::configuration(format!("plugin path '{raw}' is not absolute")))?;
        if rest.is_empty() {
            return Ok(Self { segments: Vec::new() });
        }
        let mut segments = Vec::new();
        for segment in rest.split('/') {
            if !segment_is_valid(segment) {
                return Err(PothosError::configuration(format!(
                    "plugin path '{raw}' has an invalid segment '{segment}'"
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path one level up, or `None` for the root.
    pub fn parent(&self) -> Option<PluginPath> {
        if self.segments.is_empty() {
            None
        } else {
            Some(PluginPath { segments: self.segments[..self.segments.len() - 1].to_vec() })
        }
    }

    pub fn join(&self, segment: &str) -> Result<PluginPath> {
        if !segment_is_valid(segment) {
            return Err(PothosError::configuration(format!("invalid plugin path segment '{segment}'")));
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(PluginPath { segments })
    }
}

impl std::fmt::Display for PluginPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root() {
        let p = PluginPath::parse("/").unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "/");
    }

    #[test]
    fn parses_nested_path() {
        let p = PluginPath::parse("/blocks/filters/fir").unwrap();
        assert_eq!(p.segments(), &["blocks", "filters", "fir"]);
        assert_eq!(p.to_string(), "/blocks/filters/fir");
    }

    #[test]
    fn rejects_relative_path() {
        assert!(PluginPath::parse("blocks/fir").is_err());
    }

    #[test]
    fn rejects_empty_segment() {
        assert!(PluginPath::parse("/blocks//fir").is_err());
    }

    #[test]
    fn rejects_invalid_character() {
        assert!(PluginPath::parse("/blocks/fir!").is_err());
    }

    #[test]
    fn join_and_parent_round_trip() {
        let root = PluginPath::parse("/blocks").unwrap();
        let child = root.join("fir").unwrap();
        assert_eq!(child.to_string(), "/blocks/fir");
        assert_eq!(child.parent().unwrap(), root);
    }
}
