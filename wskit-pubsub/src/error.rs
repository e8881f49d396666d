//! Pub/sub-specific failure category. Distinct from [`wskit_core::error::WireError`]
//! because it is produced by a driver operation, not the dispatch pipeline
//! itself -- callers that need one error type can still fold it in with a
//! `From` impl local to their crate.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PubSubError {
    #[error("operation unsupported by this driver: {reason}")]
    Unsupported { reason: String },

    #[error("transport error: {detail}")]
    Transport { detail: String },
}
