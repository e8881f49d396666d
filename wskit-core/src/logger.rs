//! Structured logging facade.
//!
//! Every subsystem logs through [`Logger`] rather than calling `tracing`'s
//! macros directly, so dispatch-pipeline stages, rate-limit denials, and
//! reconnect attempts can be asserted on in tests via [`CapturingLogger`]
//! without scraping text output. [`TracingLogger`] is the production
//! adapter over the `tracing` ecosystem.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One structured log event: a severity, a message, and a flat set of
/// key/value fields (e.g. `client_id`, `type`, `retry_after_ms`).
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: LogSeverity,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Ambient logging sink. Object-safe so it can be shared as `Arc<dyn Logger>`
/// across the server and client engines.
pub trait Logger: Send + Sync {
    fn log(&self, record: LogRecord);
}

/// Discards every record. Default for unit tests that don't assert on logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _record: LogRecord) {}
}

/// Forwards every record to the `tracing` ecosystem at the matching level,
/// with fields attached via `tracing::field`. Production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, record: LogRecord) {
        let fields = record
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        match record.severity {
            LogSeverity::Trace => tracing::trace!(%fields, "{}", record.message),
            LogSeverity::Debug => tracing::debug!(%fields, "{}", record.message),
            LogSeverity::Info => tracing::info!(%fields, "{}", record.message),
            LogSeverity::Warn => tracing::warn!(%fields, "{}", record.message),
            LogSeverity::Error => tracing::error!(%fields, "{}", record.message),
        }
    }
}

/// Test double that records every [`LogRecord`] it receives, in order, for
/// assertions. Cloning shares the same backing log (cheap `Arc` clone).
#[derive(Debug, Default, Clone)]
pub struct CapturingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().expect("logger mutex poisoned").clone()
    }

    pub fn contains_message(&self, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.message.contains(needle))
    }
}

impl Logger for CapturingLogger {
    fn log(&self, record: LogRecord) {
        self.records
            .lock()
            .expect("logger mutex poisoned")
            .push(record);
    }
}
