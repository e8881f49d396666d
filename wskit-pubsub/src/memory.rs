//! The in-process driver: maintains the subscription index directly and
//! computes an exact local match count on publish.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::driver::{Capability, PubSubDriver, PublishEnvelope, PublishOptions, PublishOutcome};
use crate::index::{ReplaceDelta, SubscriptionIndex};

/// Single-process pub/sub back-end. Holds the [`SubscriptionIndex`]
/// directly; `publish` never leaves the process, it only reports how many
/// local subscribers matched.
#[derive(Default)]
pub struct MemoryDriver {
    index: SubscriptionIndex,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PubSubDriver for MemoryDriver {
    async fn publish(&self, envelope: PublishEnvelope, opts: PublishOptions) -> PublishOutcome {
        let mut subscribers = self.index.get_subscribers(&envelope.topic);
        if opts.exclude_self {
            if let Some(publisher) = &opts.publisher {
                subscribers.retain(|id| id != publisher);
            }
        }
        PublishOutcome::matched(subscribers.len(), Capability::Exact)
    }

    fn subscribe(&self, client_id: &str, topic: &str) {
        self.index.subscribe(client_id, topic);
    }

    fn unsubscribe(&self, client_id: &str, topic: &str) {
        self.index.unsubscribe(client_id, topic);
    }

    fn get_subscribers(&self, topic: &str) -> Vec<String> {
        self.index.get_subscribers(topic)
    }

    fn list_topics(&self) -> Vec<String> {
        self.index.list_topics()
    }

    fn has_topic(&self, topic: &str) -> bool {
        self.index.has_topic(topic)
    }

    fn replace(&self, client_id: &str, new_topics: &HashSet<String>) -> ReplaceDelta {
        self.index.replace(client_id, new_topics)
    }
}
