//! The cross-process driver: local subscription bookkeeping delegated to a
//! [`MemoryDriver`], publish handed off to an injected transport rather
//! than dialing out itself.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::driver::{Capability, PubSubDriver, PublishEnvelope, PublishOptions, PublishOutcome};
use crate::index::ReplaceDelta;
use crate::memory::MemoryDriver;

/// Injected transport a [`BrokerDriver`] hands serialized envelopes to.
/// The driver never dials out itself; a real Redis/NATS binding is an
/// external integration supplying this trait.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), String>;
}

/// Publish/subscribe driver fronting a message broker. Local subscriptions
/// (this process's own clients) are tracked in a [`MemoryDriver`];
/// remote fan-out is delegated to an injected [`BrokerTransport`].
/// Distributed subscriber counts are not observable, so `publish` always
/// reports [`Capability::Unknown`], and `excludeSelf` is rejected outright
/// since the broker has no notion of which instance sent a message.
pub struct BrokerDriver<T: BrokerTransport> {
    local: MemoryDriver,
    transport: T,
    channel_prefix: String,
}

impl<T: BrokerTransport> BrokerDriver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            local: MemoryDriver::new(),
            transport,
            channel_prefix: String::new(),
        }
    }

    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }
}

#[async_trait]
impl<T: BrokerTransport> PubSubDriver for BrokerDriver<T> {
    async fn publish(&self, envelope: PublishEnvelope, opts: PublishOptions) -> PublishOutcome {
        if opts.exclude_self {
            return PublishOutcome::rejected("UNSUPPORTED", false);
        }

        let channel = format!("{}{}", self.channel_prefix, envelope.topic);
        let payload = match serde_json::to_vec(&serde_json::json!({
            "topic": envelope.topic,
            "type": envelope.ty,
            "payload": envelope.payload,
            "meta": envelope.meta,
        })) {
            Ok(bytes) => bytes,
            Err(err) => return PublishOutcome::rejected(format!("encode failed: {err}"), true),
        };

        match self.transport.publish(&channel, payload).await {
            Ok(()) => PublishOutcome {
                ok: true,
                matched_local: None,
                capability: Some(Capability::Unknown),
                error: None,
                retryable: None,
            },
            Err(err) => PublishOutcome::rejected(err, true),
        }
    }

    fn subscribe(&self, client_id: &str, topic: &str) {
        self.local.subscribe(client_id, topic);
    }

    fn unsubscribe(&self, client_id: &str, topic: &str) {
        self.local.unsubscribe(client_id, topic);
    }

    fn get_subscribers(&self, topic: &str) -> Vec<String> {
        self.local.get_subscribers(topic)
    }

    fn list_topics(&self) -> Vec<String> {
        self.local.list_topics()
    }

    fn has_topic(&self, topic: &str) -> bool {
        self.local.has_topic(topic)
    }

    fn replace(&self, client_id: &str, new_topics: &HashSet<String>) -> ReplaceDelta {
        self.local.replace(client_id, new_topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransport(Arc<AtomicUsize>);

    #[async_trait]
    impl BrokerTransport for CountingTransport {
        async fn publish(&self, _channel: &str, _payload: Vec<u8>) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_reports_unknown_capability() {
        let counter = Arc::new(AtomicUsize::new(0));
        let driver = BrokerDriver::new(CountingTransport(counter.clone()));
        let outcome = driver
            .publish(
                PublishEnvelope::new("room:1", "MSG", serde_json::json!({})),
                PublishOptions::default(),
            )
            .await;
        assert_eq!(outcome.capability, Some(Capability::Unknown));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exclude_self_is_unsupported() {
        let driver = BrokerDriver::new(CountingTransport(Arc::new(AtomicUsize::new(0))));
        let outcome = driver
            .publish(
                PublishEnvelope::new("room:1", "MSG", serde_json::json!({})),
                PublishOptions {
                    exclude_self: true,
                    publisher: Some("c1".to_string()),
                },
            )
            .await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error.as_deref(), Some("UNSUPPORTED"));
        assert_eq!(outcome.retryable, Some(false));
    }
}
