//! Host-runtime detection by capability probe rather than brand name, plus
//! the `WSKIT_RUNTIME` explicit-selector override.

/// The runtimes this reference implementation knows how to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Tokio,
    AsyncStd,
    WasmEdge,
}

impl RuntimeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Tokio => "tokio",
            RuntimeKind::AsyncStd => "async-std",
            RuntimeKind::WasmEdge => "wasm-edge",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tokio" => Some(RuntimeKind::Tokio),
            "async-std" => Some(RuntimeKind::AsyncStd),
            "wasm-edge" => Some(RuntimeKind::WasmEdge),
            _ => None,
        }
    }
}

/// A capability probe for one candidate runtime. Stands in for the
/// original runtimes' brand-specific global checks (a callable `Bun.serve`,
/// a string-valued `Deno.version.deno`, a global `WebSocketPair`
/// constructor with no `process` global): each probe answers "is my
/// runtime's defining capability present", not "what is this process
/// called".
pub trait RuntimeProbe: Send + Sync {
    fn kind(&self) -> RuntimeKind;
    fn is_available(&self) -> bool;
}

/// Detects a live Tokio runtime by asking for the current `Handle` -- the
/// one probe in this set with a real, in-process capability to check.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProbe;

impl RuntimeProbe for TokioProbe {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Tokio
    }

    fn is_available(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }
}

/// Reference stand-in: this crate does not embed an `async-std` runtime to
/// probe, so this always reports unavailable. Exists so the trait's shape
/// and the detection logic below exercise all three candidates the way the
/// original capability-probe set does.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncStdProbe;

impl RuntimeProbe for AsyncStdProbe {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::AsyncStd
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Reference stand-in, see [`AsyncStdProbe`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmEdgeProbe;

impl RuntimeProbe for WasmEdgeProbe {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::WasmEdge
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Why runtime resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectError {
    #[error("no runtime probe reported availability")]
    NoneDetected,

    #[error("more than one runtime probe reported availability: {}", candidates.join(", "))]
    Ambiguous { candidates: Vec<&'static str> },

    #[error("WSKIT_RUNTIME must be set explicitly in production (auto-detection is a development convenience only)")]
    MissingExplicitSelector,

    #[error("WSKIT_RUNTIME=`{value}` is not one of tokio, async-std, wasm-edge")]
    UnknownSelector { value: String },
}

/// Resolves which runtime to target. `env_override` is the value of
/// `WSKIT_RUNTIME`, if set -- callers take this as a parameter (rather
/// than this function reading the process environment itself) so
/// resolution stays deterministic and test-injectable, the same seam
/// [`wskit_core::Clock`] uses for time.
///
/// An explicit selector is trusted without probing: if `env_override` is
/// `Some`, the probes are never consulted, even if they would disagree
/// with it. Its absence is only tolerated outside production.
pub fn resolve_runtime(
    env_override: Option<&str>,
    production: bool,
    probes: &[&dyn RuntimeProbe],
) -> Result<RuntimeKind, DetectError> {
    if let Some(value) = env_override {
        return RuntimeKind::parse(value).ok_or_else(|| DetectError::UnknownSelector {
            value: value.to_string(),
        });
    }

    if production {
        return Err(DetectError::MissingExplicitSelector);
    }

    let matches: Vec<RuntimeKind> = probes
        .iter()
        .filter(|probe| probe.is_available())
        .map(|probe| probe.kind())
        .collect();

    match matches.len() {
        0 => Err(DetectError::NoneDetected),
        1 => Ok(matches[0]),
        _ => Err(DetectError::Ambiguous {
            candidates: matches.iter().map(|kind| kind.as_str()).collect(),
        }),
    }
}

/// Convenience wrapper reading the real `WSKIT_RUNTIME` process
/// environment variable. Production code calls this; tests call
/// [`resolve_runtime`] directly with an explicit `env_override` to avoid
/// races over process-global env state between parallel test threads.
pub fn resolve_runtime_from_env(
    production: bool,
    probes: &[&dyn RuntimeProbe],
) -> Result<RuntimeKind, DetectError> {
    let value = std::env::var("WSKIT_RUNTIME").ok();
    resolve_runtime(value.as_deref(), production, probes)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysAvailable(RuntimeKind);
    impl RuntimeProbe for AlwaysAvailable {
        fn kind(&self) -> RuntimeKind {
            self.0
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    struct NeverAvailable(RuntimeKind);
    impl RuntimeProbe for NeverAvailable {
        fn kind(&self) -> RuntimeKind {
            self.0
        }
        fn is_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn explicit_selector_is_trusted_without_probing() {
        let probes: [&dyn RuntimeProbe; 1] = [&NeverAvailable(RuntimeKind::Tokio)];
        let kind = resolve_runtime(Some("tokio"), false, &probes).unwrap();
        assert_eq!(kind, RuntimeKind::Tokio);
    }

    #[test]
    fn unknown_selector_value_is_rejected() {
        let err = resolve_runtime(Some("bun"), false, &[]).unwrap_err();
        assert!(matches!(err, DetectError::UnknownSelector { .. }));
    }

    #[test]
    fn production_without_selector_is_fatal() {
        let err = resolve_runtime(None, true, &[]).unwrap_err();
        assert!(matches!(err, DetectError::MissingExplicitSelector));
    }

    #[test]
    fn development_falls_back_to_single_matching_probe() {
        let probes: [&dyn RuntimeProbe; 2] = [
            &AlwaysAvailable(RuntimeKind::Tokio),
            &NeverAvailable(RuntimeKind::AsyncStd),
        ];
        let kind = resolve_runtime(None, false, &probes).unwrap();
        assert_eq!(kind, RuntimeKind::Tokio);
    }

    #[test]
    fn development_with_no_matching_probe_fails() {
        let probes: [&dyn RuntimeProbe; 1] = [&NeverAvailable(RuntimeKind::Tokio)];
        let err = resolve_runtime(None, false, &probes).unwrap_err();
        assert!(matches!(err, DetectError::NoneDetected));
    }

    #[test]
    fn development_with_ambiguous_probes_fails() {
        let probes: [&dyn RuntimeProbe; 2] = [
            &AlwaysAvailable(RuntimeKind::Tokio),
            &AlwaysAvailable(RuntimeKind::AsyncStd),
        ];
        let err = resolve_runtime(None, false, &probes).unwrap_err();
        assert!(matches!(err, DetectError::Ambiguous { .. }));
    }

    #[tokio::test]
    async fn tokio_probe_reports_available_inside_a_tokio_runtime() {
        assert!(TokioProbe.is_available());
    }

    #[test]
    fn tokio_probe_reports_unavailable_outside_a_tokio_runtime() {
        assert!(!TokioProbe.is_available());
    }
}
