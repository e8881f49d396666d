//! The subscription bijection: `topic -> {clientId}` and
//! `clientId -> {topic}` kept in lockstep, backed by `DashMap` the same way
//! the teacher's `spark-switch::core::session_manager` keeps its concurrent
//! session table -- per-key updates never contend with unrelated keys.

use std::collections::HashSet;

use dashmap::DashMap;

/// The result of a [`SubscriptionIndex::replace`] call: how many topics
/// were newly subscribed and how many were dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceDelta {
    pub added: usize,
    pub removed: usize,
}

/// Bijective index between topics and client ids. Empty sets on either
/// side are deleted immediately, so no zombie keys accumulate as clients
/// subscribe and unsubscribe over a long-lived server's lifetime.
#[derive(Default)]
pub struct SubscriptionIndex {
    topics: DashMap<String, HashSet<String>>,
    client_topics: DashMap<String, HashSet<String>>,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: subscribing twice leaves the index identical to
    /// subscribing once.
    pub fn subscribe(&self, client_id: &str, topic: &str) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(client_id.to_string());
        self.client_topics
            .entry(client_id.to_string())
            .or_default()
            .insert(topic.to_string());
    }

    /// Idempotent: unsubscribing from a topic the client never joined is a
    /// no-op. Deletes either side's entry once its set becomes empty.
    pub fn unsubscribe(&self, client_id: &str, topic: &str) {
        if let Some(mut subscribers) = self.topics.get_mut(topic) {
            subscribers.remove(client_id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.topics.remove(topic);
            }
        }
        if let Some(mut topics) = self.client_topics.get_mut(client_id) {
            topics.remove(topic);
            if topics.is_empty() {
                drop(topics);
                self.client_topics.remove(client_id);
            }
        }
    }

    pub fn get_subscribers(&self, topic: &str) -> Vec<String> {
        self.topics
            .get(topic)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn client_topic_count(&self, client_id: &str) -> usize {
        self.client_topics.get(client_id).map(|set| set.len()).unwrap_or(0)
    }

    pub fn list_topics(&self) -> Vec<String> {
        self.topics.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Replaces a client's full topic set with `new_topics` in one call,
    /// computing the minimal set-difference rather than unsubscribing
    /// everything and resubscribing. A no-op call (identical set) mutates
    /// nothing and returns `{added: 0, removed: 0}`.
    pub fn replace(&self, client_id: &str, new_topics: &HashSet<String>) -> ReplaceDelta {
        let current: HashSet<String> = self
            .client_topics
            .get(client_id)
            .map(|set| set.clone())
            .unwrap_or_default();

        if &current == new_topics {
            return ReplaceDelta { added: 0, removed: 0 };
        }

        let to_add: Vec<&String> = new_topics.difference(&current).collect();
        let to_remove: Vec<&String> = current.difference(new_topics).collect();

        for topic in &to_add {
            self.subscribe(client_id, topic);
        }
        for topic in &to_remove {
            self.unsubscribe(client_id, topic);
        }

        ReplaceDelta {
            added: to_add.len(),
            removed: to_remove.len(),
        }
    }

    /// Drops every subscription a client holds. Used on disconnect when a
    /// driver has no more targeted `replace(clientId, ∅)` shortcut.
    pub fn drop_client(&self, client_id: &str) {
        self.replace(client_id, &HashSet::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_is_idempotent() {
        let index = SubscriptionIndex::new();
        index.subscribe("c1", "room:1");
        index.subscribe("c1", "room:1");
        assert_eq!(index.get_subscribers("room:1"), vec!["c1".to_string()]);
        assert_eq!(index.client_topic_count("c1"), 1);
    }

    #[test]
    fn unsubscribe_removes_zombie_keys() {
        let index = SubscriptionIndex::new();
        index.subscribe("c1", "room:1");
        index.unsubscribe("c1", "room:1");
        assert!(!index.has_topic("room:1"));
        assert_eq!(index.client_topic_count("c1"), 0);
    }

    #[test]
    fn bijection_holds_across_multiple_clients_and_topics() {
        let index = SubscriptionIndex::new();
        index.subscribe("c1", "room:1");
        index.subscribe("c2", "room:1");
        index.subscribe("c1", "room:2");

        for topic in index.list_topics() {
            for client in index.get_subscribers(&topic) {
                assert!(
                    index
                        .client_topics
                        .get(&client)
                        .map(|s| s.contains(&topic))
                        .unwrap_or(false)
                );
            }
        }
    }

    #[test]
    fn replace_is_a_no_op_when_sets_are_equal() {
        let index = SubscriptionIndex::new();
        index.subscribe("c1", "room:1");
        let same: HashSet<String> = ["room:1".to_string()].into_iter().collect();
        let delta = index.replace("c1", &same);
        assert_eq!(delta, ReplaceDelta { added: 0, removed: 0 });
    }

    #[test]
    fn replace_computes_minimal_diff() {
        let index = SubscriptionIndex::new();
        index.subscribe("c1", "room:1");
        index.subscribe("c1", "room:2");
        let next: HashSet<String> = ["room:2".to_string(), "room:3".to_string()].into_iter().collect();
        let delta = index.replace("c1", &next);
        assert_eq!(delta, ReplaceDelta { added: 1, removed: 1 });
        assert!(!index.has_topic("room:1"));
    }

    #[test]
    fn drop_client_removes_all_subscriptions() {
        let index = SubscriptionIndex::new();
        index.subscribe("c1", "room:1");
        index.subscribe("c1", "room:2");
        index.drop_client("c1");
        assert_eq!(index.client_topic_count("c1"), 0);
        assert!(!index.has_topic("room:1"));
        assert!(!index.has_topic("room:2"));
    }
}
