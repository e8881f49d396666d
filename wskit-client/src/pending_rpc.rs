//! Correlation-id bookkeeping for in-flight `request()` calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use wskit_core::{Clock, MessageDescriptor};

use crate::error::ClientError;

/// Default RPC timeout when `request()` is called without an explicit
/// `timeoutMs`.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

struct Entry {
    response_descriptor: Arc<MessageDescriptor>,
    resolver: oneshot::Sender<Result<Value, ClientError>>,
}

/// Tracks one `PendingRpc` per in-flight `correlationId`. Removal is
/// atomic with respect to resolution: whichever of "matching inbound
/// frame arrives", "timeout elapses", or "connection closes" gets there
/// first wins, and the other paths find the entry already gone.
#[derive(Default)]
pub struct PendingRpcRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl PendingRpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pending request and returns the receiver the caller
    /// awaits for its outcome.
    pub fn register(
        &self,
        correlation_id: String,
        response_descriptor: Arc<MessageDescriptor>,
    ) -> oneshot::Receiver<Result<Value, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(
            correlation_id,
            Entry {
                response_descriptor,
                resolver: tx,
            },
        );
        rx
    }

    /// Resolves a pending entry whose `correlationId` and response
    /// descriptor both match. Returns `true` if an entry was resolved.
    pub fn resolve(&self, correlation_id: &str, ty: &str, payload: Value) -> bool {
        let entry = self.entries.lock().remove(correlation_id);
        match entry {
            Some(entry) if entry.response_descriptor.ty() == ty => {
                let _ = entry.resolver.send(Ok(payload));
                true
            }
            Some(entry) => {
                // Put it back: the correlation id matched but the response
                // type did not, so this frame is not the entry's answer.
                self.entries.lock().insert(correlation_id.to_string(), entry);
                false
            }
            None => false,
        }
    }

    /// Fails every pending entry with [`ClientError::ConnectionClosed`] --
    /// called once when the connection transitions to `closed`.
    pub fn fail_all_closed(&self) {
        let mut entries = self.entries.lock();
        for (correlation_id, entry) in entries.drain() {
            let _ = entry.resolver.send(Err(ClientError::ConnectionClosed { correlation_id }));
        }
    }

    /// Removes and fails a single entry with [`ClientError::TimedOut`], if
    /// it is still pending (it may already have been resolved or failed).
    pub fn fail_timed_out(&self, correlation_id: &str, timeout_ms: u64) {
        if let Some(entry) = self.entries.lock().remove(correlation_id) {
            let _ = entry.resolver.send(Err(ClientError::TimedOut {
                correlation_id: correlation_id.to_string(),
                timeout_ms,
            }));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Awaits `rx`, racing it against `clock.sleep(timeout)`. On timeout,
/// removes the entry from `registry` (if still present) and returns
/// [`ClientError::TimedOut`].
pub async fn await_with_timeout(
    registry: &PendingRpcRegistry,
    correlation_id: &str,
    rx: oneshot::Receiver<Result<Value, ClientError>>,
    clock: &dyn Clock,
    timeout: Duration,
) -> Result<Value, ClientError> {
    tokio::select! {
        biased;
        result = rx => result.unwrap_or_else(|_| Err(ClientError::ConnectionClosed {
            correlation_id: correlation_id.to_string(),
        })),
        _ = clock.sleep(timeout) => {
            registry.fail_timed_out(correlation_id, timeout.as_millis() as u64);
            Err(ClientError::TimedOut {
                correlation_id: correlation_id.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wskit_core::MockClock;

    fn pong_descriptor() -> Arc<MessageDescriptor> {
        Arc::new(MessageDescriptor::event("PONG"))
    }

    #[test]
    fn resolve_matches_correlation_id_and_type() {
        let registry = PendingRpcRegistry::new();
        let rx = registry.register("c1".into(), pong_descriptor());
        assert!(registry.resolve("c1", "PONG", Value::Null));
        assert_eq!(rx.try_recv().unwrap().unwrap(), Value::Null);
    }

    #[test]
    fn resolve_with_mismatched_type_leaves_entry_pending() {
        let registry = PendingRpcRegistry::new();
        let _rx = registry.register("c1".into(), pong_descriptor());
        assert!(!registry.resolve("c1", "SOMETHING_ELSE", Value::Null));
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn fail_all_closed_drains_every_entry() {
        let registry = PendingRpcRegistry::new();
        let rx1 = registry.register("c1".into(), pong_descriptor());
        let rx2 = registry.register("c2".into(), pong_descriptor());
        registry.fail_all_closed();
        assert!(matches!(
            rx1.try_recv().unwrap().unwrap_err(),
            ClientError::ConnectionClosed { .. }
        ));
        assert!(matches!(
            rx2.try_recv().unwrap().unwrap_err(),
            ClientError::ConnectionClosed { .. }
        ));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn await_with_timeout_times_out_via_mock_clock() {
        let registry = PendingRpcRegistry::new();
        let rx = registry.register("c1".into(), pong_descriptor());
        let clock = MockClock::new(0);
        let err = await_with_timeout(&registry, "c1", rx, &clock, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TimedOut { .. }));
        assert_eq!(registry.pending_count(), 0);
    }
}
