//! The uniform driver contract every back-end (memory, broker, sharded)
//! implements, plus the shared publish types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::index::ReplaceDelta;

/// Whether a [`PublishOutcome`]'s subscriber count is exact (in-process
/// drivers can count directly) or unknown (distributed drivers cannot
/// observe every remote subscriber).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Exact,
    Unknown,
}

/// A message to fan out to every subscriber of `topic`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishEnvelope {
    pub topic: String,
    pub ty: String,
    pub payload: Value,
    pub meta: BTreeMap<String, Value>,
}

impl PublishEnvelope {
    pub fn new(topic: impl Into<String>, ty: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            ty: ty.into(),
            payload,
            meta: BTreeMap::new(),
        }
    }
}

/// `{ excludeSelf? }`, plus the publishing client's id so a driver that
/// honors `exclude_self` knows which subscriber to leave out of its
/// matched count. `publisher` is `None` for server-originated publishes
/// with no client context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOptions {
    pub exclude_self: bool,
    pub publisher: Option<String>,
}

/// The result of one [`PubSubDriver::publish`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    pub ok: bool,
    pub matched_local: Option<usize>,
    pub capability: Option<Capability>,
    pub error: Option<String>,
    pub retryable: Option<bool>,
}

impl PublishOutcome {
    pub fn matched(count: usize, capability: Capability) -> Self {
        Self {
            ok: true,
            matched_local: Some(count),
            capability: Some(capability),
            error: None,
            retryable: None,
        }
    }

    pub fn rejected(error: impl Into<String>, retryable: bool) -> Self {
        Self {
            ok: false,
            matched_local: None,
            capability: None,
            error: Some(error.into()),
            retryable: Some(retryable),
        }
    }
}

/// The contract every publish/subscribe back-end implements. The driver
/// itself never touches sockets: the server engine reads
/// [`PubSubDriver::get_subscribers`] and performs delivery.
#[async_trait]
pub trait PubSubDriver: Send + Sync {
    async fn publish(&self, envelope: PublishEnvelope, opts: PublishOptions) -> PublishOutcome;

    fn subscribe(&self, client_id: &str, topic: &str);

    fn unsubscribe(&self, client_id: &str, topic: &str);

    fn get_subscribers(&self, topic: &str) -> Vec<String>;

    fn list_topics(&self) -> Vec<String> {
        Vec::new()
    }

    fn has_topic(&self, _topic: &str) -> bool {
        false
    }

    fn replace(&self, _client_id: &str, _new_topics: &std::collections::HashSet<String>) -> ReplaceDelta {
        ReplaceDelta { added: 0, removed: 0 }
    }
}
