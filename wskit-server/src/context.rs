//! Per-connection state and the handler-facing API surface
//! (`send`/`publish`/`subscribe`/`unsubscribe`/`close`).

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use wskit_core::{Clock, CloseError, Envelope};
use wskit_pubsub::{PubSubDriver, PublishEnvelope, PublishOptions, PublishOutcome};

/// A frame ready to leave the connection: either a normal outbound
/// envelope or a request to close the socket.
pub enum Outbound {
    Frame(Envelope),
    Close(CloseError),
}

/// Per-connection attachment plus everything a handler needs to act:
/// send a response, publish to a topic, (un)subscribe, or close the
/// connection. This is the `Ctx` type parameter [`wskit_router::Router`]
/// is instantiated with throughout this crate.
pub struct ConnectionContext {
    client_id: String,
    pub data: Value,
    inbound_correlation_id: Option<String>,
    subscribed: HashSet<String>,
    outbound: mpsc::UnboundedSender<Outbound>,
    pubsub: Arc<dyn PubSubDriver>,
    clock: Arc<dyn Clock>,
    response_sent: std::cell::Cell<bool>,
}

impl ConnectionContext {
    pub fn new(
        client_id: String,
        outbound: mpsc::UnboundedSender<Outbound>,
        pubsub: Arc<dyn PubSubDriver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client_id,
            data: Value::Null,
            inbound_correlation_id: None,
            subscribed: HashSet::new(),
            outbound,
            pubsub,
            clock,
            response_sent: std::cell::Cell::new(false),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn subscribed_topics(&self) -> &HashSet<String> {
        &self.subscribed
    }

    /// Primes the inbound correlation id carried by the frame currently
    /// being dispatched, so [`ConnectionContext::send`] can copy it into
    /// the response. Called by the dispatch pipeline before invoking
    /// middleware/handler, never by application code.
    pub(crate) fn set_inbound_correlation_id(&mut self, correlation_id: Option<String>) {
        self.inbound_correlation_id = correlation_id;
    }

    /// Whether `send`/`send_meta` has produced a response since the last
    /// [`ConnectionContext::reset_response_sent`] call. Read by the dispatch
    /// pipeline to decide whether a handler error still needs an
    /// `INTERNAL_ERROR` frame of its own.
    pub fn response_sent(&self) -> bool {
        self.response_sent.get()
    }

    /// Clears the sent-flag. Called by the dispatch pipeline once per
    /// inbound frame, before routing to a handler.
    pub(crate) fn reset_response_sent(&self) {
        self.response_sent.set(false);
    }

    /// Builds and enqueues a response envelope, stamping the
    /// server-reserved `meta.timestamp` and, when the inbound message
    /// carried one, `meta.correlationId`. These two keys are always set
    /// by the engine and can never be overridden by handler-supplied meta.
    pub fn send(&self, ty: impl Into<String>, payload: Value) {
        let mut envelope = Envelope::new(ty).with_payload(payload);
        envelope = envelope.with_meta("timestamp", Value::from(self.clock.now_millis()));
        if let Some(correlation_id) = &self.inbound_correlation_id {
            envelope = envelope.with_meta("correlationId", Value::from(correlation_id.clone()));
        }
        self.response_sent.set(true);
        let _ = self.outbound.send(Outbound::Frame(envelope));
    }

    pub fn send_meta(&self, ty: impl Into<String>, payload: Value, meta: BTreeMap<String, Value>) {
        let mut envelope = Envelope::new(ty).with_payload(payload);
        envelope.meta = meta;
        envelope.normalize();
        envelope = envelope.with_meta("timestamp", Value::from(self.clock.now_millis()));
        if let Some(correlation_id) = &self.inbound_correlation_id {
            envelope = envelope.with_meta("correlationId", Value::from(correlation_id.clone()));
        }
        self.response_sent.set(true);
        let _ = self.outbound.send(Outbound::Frame(envelope));
    }

    pub async fn publish(&self, topic: impl Into<String>, ty: impl Into<String>, payload: Value, opts: PublishOptions) -> PublishOutcome {
        let mut opts = opts;
        if opts.publisher.is_none() {
            opts.publisher = Some(self.client_id.clone());
        }
        self.pubsub.publish(PublishEnvelope::new(topic, ty, payload), opts).await
    }

    pub fn subscribe(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        self.pubsub.subscribe(&self.client_id, &topic);
        self.subscribed.insert(topic);
    }

    pub fn unsubscribe(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        self.pubsub.unsubscribe(&self.client_id, &topic);
        self.subscribed.remove(&topic);
    }

    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.outbound.send(Outbound::Close(CloseError::new(code, reason)));
    }

    /// Unsubscribes from every topic this connection holds, used on
    /// teardown.
    pub fn unsubscribe_all(&mut self) {
        for topic in self.subscribed.drain().collect::<Vec<_>>() {
            self.pubsub.unsubscribe(&self.client_id, &topic);
        }
    }
}
