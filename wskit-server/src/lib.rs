//! The server-side engine: per-connection lifecycle, the dispatch
//! pipeline, and the handler context. Transport-level accept/upgrade
//! plumbing and the wire codec are out of scope -- this crate starts from
//! an already-decoded `serde_json::Value` per inbound frame and an
//! outbound channel the transport layer drains.

pub mod config;
pub mod connection;
pub mod context;
pub mod dispatch;
pub mod tests_support;

pub use config::{EngineConfig, EngineConfigBuilder, UnknownRouteBehavior};
pub use connection::{ConnectionHandle, spawn_connection};
pub use context::{ConnectionContext, Outbound};
pub use dispatch::Engine;
