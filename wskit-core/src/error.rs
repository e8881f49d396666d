//! Error taxonomy (kinds, not one flat type).
//!
//! Grounded in the teacher's `SwitchError`-style convention: one focused
//! `thiserror`-derived enum per failure category, each variant carrying
//! the identifiers needed to act on it, with `From` conversions into a
//! single [`WsKitError`] for call sites that want to propagate with `?`.
//! Setup errors ([`ConfigError`]) are a distinct category from per-message
//! errors ([`WireError`]): the former must never reach the wire, the
//! latter always does (as one of the error frame types in the wire
//! contract).

use crate::validator::ValidationIssue;

// Note on taxonomy shape: the rate-limiter's failure modes are already
// covered here rather than via a separate `RateLimitError` enum --
// `ConfigError::InvalidCapacity`/`InvalidRefillRate` are its setup-time
// half and `WireError::RateExhausted` is its per-message half, which is
// exactly the config/wire split every other category in this module
// follows. `wskit-pubsub::PubSubError` stays local to that crate instead
// of folding in here, since lifting it into `WsKitError` would make
// `wskit-core` depend on a crate that depends on it.

/// Raised at setup time -- descriptor registration, route table assembly,
/// rate-limit policy construction. Never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("descriptor `{ty}` declares reserved meta key(s): {}", keys.join(", "))]
    ReservedMetaKeyDeclared { ty: String, keys: Vec<String> },

    #[error("route `{ty}` is already registered")]
    DuplicateRoute { ty: String },

    #[error("rate-limit capacity must be >= 1, got {capacity}")]
    InvalidCapacity { capacity: i64 },

    #[error("rate-limit tokensPerSecond must be > 0, got {tokens_per_second}")]
    InvalidRefillRate { tokens_per_second: f64 },

    #[error("outbound queue capacity must be >= 1 when policy is not `off`, got {capacity}")]
    InvalidQueueCapacity { capacity: usize },

    #[error("reconnect max_delay must be >= base_delay and base_delay must be non-zero")]
    InvalidReconnectBounds,
}

/// Per-message error categories. Every variant corresponds 1:1 to a
/// server-emitted error frame type (`BAD_ENVELOPE`, `UNKNOWN_TYPE`, ...);
/// the connection stays open after every one of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("frame could not be decoded into an envelope: {reason}")]
    BadEnvelope { reason: String },

    #[error("no route registered for type `{ty}`")]
    UnknownType { ty: String },

    #[error("validation failed for type `{ty}`")]
    ValidationFailed {
        ty: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("rate limit exceeded for key `{key}`, retry after {retry_after_ms}ms")]
    RateExhausted { key: String, retry_after_ms: u64 },

    #[error("handler for type `{ty}` failed: {detail}")]
    HandlerError { ty: String, detail: String },
}

impl WireError {
    /// The `type` string of the error frame this error is reported to the
    /// client as. Part of the wire contract, not an implementation detail.
    pub fn wire_type(&self) -> &'static str {
        match self {
            WireError::BadEnvelope { .. } => "BAD_ENVELOPE",
            WireError::UnknownType { .. } => "UNKNOWN_TYPE",
            WireError::ValidationFailed { .. } => "VALIDATION_FAILED",
            WireError::RateExhausted { .. } => "RESOURCE_EXHAUSTED",
            WireError::HandlerError { .. } => "INTERNAL_ERROR",
        }
    }

    /// The payload of the error frame this error is reported to the client
    /// as, matching each wire type's documented shape.
    pub fn wire_payload(&self) -> serde_json::Value {
        match self {
            WireError::BadEnvelope { reason } => serde_json::json!({ "reason": reason }),
            WireError::UnknownType { ty } => serde_json::json!({ "type": ty }),
            WireError::ValidationFailed { issues, .. } => serde_json::json!({
                "issues": issues
                    .iter()
                    .map(|issue| serde_json::json!({ "path": issue.path, "message": issue.message }))
                    .collect::<Vec<_>>(),
            }),
            WireError::RateExhausted { retry_after_ms, .. } => serde_json::json!({
                "policy": "rate-limit",
                "retryAfterMs": retry_after_ms,
            }),
            WireError::HandlerError { detail, .. } => serde_json::json!({ "reason": detail }),
        }
    }
}

/// Client-side RPC failure categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("request `{correlation_id}` timed out after {timeout_ms}ms")]
    TimedOut {
        correlation_id: String,
        timeout_ms: u64,
    },

    #[error("connection closed while request `{correlation_id}` was pending")]
    ConnectionClosed { correlation_id: String },

    #[error("outbound queue dropped a frame under `{policy}` policy (capacity {max_size})")]
    QueueOverflow { policy: String, max_size: usize },

    #[error("descriptor `{ty}` is not an RPC descriptor (no response descriptor)")]
    NotRpcDescriptor { ty: String },
}

/// Aggregate error type for call sites that want a single `?`-propagatable
/// error rather than matching on category.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WsKitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_never_wraps_into_wire_error_implicitly() {
        let err: WsKitError = ConfigError::DuplicateRoute {
            ty: "PING".into(),
        }
        .into();
        assert!(matches!(err, WsKitError::Config(_)));
    }
}
