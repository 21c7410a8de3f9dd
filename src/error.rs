//! The error taxonomy shared across every layer of the scheduler and buffer plumbing.
//!
//! Every kind named in the framework's error design maps to exactly one variant here so
//! callers can match on `PothosError::PortAccess { .. }` rather than parsing message
//! strings. `work()` panics are caught at the actor boundary (see `actor::worker`) and
//! folded into `PothosError::WorkPanic` rather than escaping and tearing down the graph.

use crate::dtype::DType;
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PothosError>;

#[derive(Debug, thiserror::Error)]
pub enum PothosError {
    /// Malformed plugin path, bad topology JSON, or an unknown factory reference.
    /// Surfaced to the caller of `commit()`; a commit that fails this way is not partially applied.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// A port was referenced by a name/index that does not exist, or `front()` was called
    /// on an empty `BufferAccumulator`.
    #[error("port access error on '{port}': {reason}")]
    PortAccess { port: String, reason: String },

    /// `BufferAccumulator::require` asked for more bytes than any reachable allocation
    /// could satisfy.
    #[error("buffer capacity error: requested {requested} bytes, max reachable {available}")]
    BufferCapacity { requested: usize, available: usize },

    /// Two connected ports have dtypes with neither equality nor a registered conversion.
    /// Detected at `commit()`, which aborts without touching any actor state.
    #[error("dtype mismatch: cannot connect {src} -> {dst}")]
    DTypeMismatch { src: DType, dst: DType },

    /// A plugin module failed to load. Logged and skipped; the rest of the framework
    /// remains usable.
    #[error("module load error for '{path}': {reason}")]
    ModuleLoad { path: String, reason: String },

    /// A remote RPC call over the cross-process bridge failed.
    #[error("proxy error: {reason}")]
    Proxy { reason: String },

    /// An I/O failure under the cross-process bridge transport.
    #[error("bridge transport error: {0}")]
    BridgeIo(#[source] io::Error),

    /// A message was posted to an actor after it received `Shutdown`. Not surfaced to
    /// callers as a hard failure — the scheduler silently drops it, but the variant
    /// exists so logging call sites can say precisely what happened.
    #[error("shutdown pending: message dropped for actor '{actor}'")]
    ShutdownPending { actor: String },

    /// `work()` unwound via panic rather than returning. The scheduler records this in
    /// `WorkStats` and keeps the rest of the graph running.
    #[error("work() panicked in block '{block}': {message}")]
    WorkPanic { block: String, message: String },
}

impl PothosError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }

    pub fn port_access(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PortAccess { port: port.into(), reason: reason.into() }
    }
}
