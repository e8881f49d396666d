//! Host-runtime detection for the serve entrypoint: capability probes
//! standing in for the original runtimes' brand-specific global checks,
//! plus the `WSKIT_RUNTIME` explicit-selector override and its
//! production-requires-explicit-selector fail-fast rule.

pub mod runtime;

pub use runtime::{
    resolve_runtime, resolve_runtime_from_env, AsyncStdProbe, DetectError, RuntimeKind, RuntimeProbe,
    TokioProbe, WasmEdgeProbe,
};
