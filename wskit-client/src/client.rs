//! The client engine: ties the state machine, outbound queue, RPC
//! correlation, handler registry, and reconnect policy together around an
//! injected [`Transport`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use wskit_core::{ClientError, Envelope, MessageDescriptor};

use crate::config::ClientConfig;
use crate::handlers::{HandlerRegistry, Unsubscribe};
use crate::pending_rpc::{await_with_timeout, PendingRpcRegistry};
use crate::queue::OutboundQueue;
use crate::reconnect::{Jitter, RandJitter};
use crate::state::ClientState;
use crate::transport::Transport;

/// The client engine, generic over its [`Transport`] implementation.
pub struct Client<T: Transport> {
    transport: Arc<T>,
    config: ClientConfig,
    state: Mutex<ClientState>,
    queue: OutboundQueue,
    pending: PendingRpcRegistry,
    handlers: Arc<HandlerRegistry>,
    jitter: Mutex<Box<dyn Jitter>>,
    attempt: AtomicU32,
}

impl<T: Transport + 'static> Client<T> {
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Arc<Self> {
        Arc::new(Self {
            transport,
            queue: OutboundQueue::new(config.queue_capacity, config.queue_policy),
            pending: PendingRpcRegistry::new(),
            handlers: HandlerRegistry::new(),
            jitter: Mutex::new(Box::new(RandJitter)),
            attempt: AtomicU32::new(0),
            config,
        })
    }

    pub fn state(&self) -> ClientState {
        *self.state.lock()
    }

    fn transition(&self, next: ClientState) -> bool {
        let mut state = self.state.lock();
        if state.can_transition_to(next) {
            *state = next;
            true
        } else {
            false
        }
    }

    /// Idempotent: if a connection attempt is already in flight or open,
    /// returns immediately without starting another.
    pub async fn connect(self: &Arc<Self>) -> Result<(), String> {
        if self.state().is_connecting_or_open() {
            return Ok(());
        }
        if !self.transition(ClientState::Connecting) {
            return Ok(());
        }

        match self.transport.connect().await {
            Ok(()) => {
                self.transition(ClientState::Open);
                self.attempt.store(0, Ordering::SeqCst);
                let transport = self.transport.clone();
                self.queue
                    .flush(|frame| {
                        let transport = transport.clone();
                        async move { transport.send_frame(frame).await }
                    })
                    .await;
                Ok(())
            }
            Err(err) => {
                self.transition(ClientState::Closed);
                self.pending.fail_all_closed();
                Err(err)
            }
        }
    }

    /// Runs the reconnect loop: sleeps a capped, jittered exponential
    /// backoff between attempts and calls [`Client::connect`] until it
    /// succeeds, the policy's `max_attempts` is exhausted, or reconnection
    /// is disabled.
    pub async fn reconnect(self: &Arc<Self>) -> Result<(), String> {
        if !self.config.reconnect.enabled {
            return Err("reconnect disabled".to_string());
        }
        loop {
            let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.config.reconnect.should_retry(attempt) {
                return Err("reconnect attempts exhausted".to_string());
            }
            let delay = {
                let mut jitter = self.jitter.lock();
                crate::reconnect::backoff_delay(&self.config.reconnect, attempt, jitter.as_mut())
            };
            self.config.clock.sleep(delay).await;
            if self.connect().await.is_ok() {
                return Ok(());
            }
        }
    }

    /// Writes `frame` immediately if `open`, otherwise enqueues it (subject
    /// to the configured overflow policy). Returns `true` on enqueue/send,
    /// `false` on drop.
    pub async fn send(&self, ty: impl Into<String>, payload: Value) -> bool {
        let frame = Envelope::new(ty).with_payload(payload);
        if self.state() == ClientState::Open {
            self.transport.send_frame(frame).await.is_ok()
        } else {
            self.queue.enqueue(frame)
        }
    }

    /// `send`, but fails immediately with a `ClientError::QueueOverflow` if
    /// the frame was dropped instead of enqueued/sent.
    pub async fn send_checked(&self, ty: impl Into<String>, payload: Value) -> Result<(), ClientError> {
        if self.send(ty, payload).await {
            Ok(())
        } else {
            Err(ClientError::QueueOverflow {
                policy: self.config.queue_policy.as_str().to_string(),
                max_size: self.config.queue_capacity,
            })
        }
    }

    pub fn on_overflow(&self, callback: impl Fn(&crate::queue::OverflowEvent) + Send + Sync + 'static) {
        self.queue.on_overflow(callback);
    }

    pub fn on(
        self: &Arc<Self>,
        ty: impl Into<String>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.handlers.on(ty, handler)
    }

    /// Sends a request and awaits its correlated response, honoring
    /// `timeout` (or the configured default if `None`).
    pub async fn request(
        &self,
        descriptor: &MessageDescriptor,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, ClientError> {
        let response_descriptor = match descriptor.response_descriptor() {
            Some(response_descriptor) => response_descriptor.clone(),
            None => {
                return Err(ClientError::NotRpcDescriptor {
                    ty: descriptor.ty().to_string(),
                });
            }
        };
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let rx = self
            .pending
            .register(correlation_id.clone(), Arc::new(response_descriptor));

        let frame = Envelope::new(descriptor.ty())
            .with_payload(payload)
            .with_meta("correlationId", Value::String(correlation_id.clone()));
        let sent = if self.state() == ClientState::Open {
            self.transport.send_frame(frame).await.is_ok()
        } else {
            self.queue.enqueue(frame)
        };
        if !sent {
            self.pending.fail_timed_out(&correlation_id, 0);
            return Err(ClientError::ConnectionClosed { correlation_id });
        }

        let timeout = timeout.unwrap_or(self.config.default_rpc_timeout);
        await_with_timeout(&self.pending, &correlation_id, rx, self.config.clock.as_ref(), timeout).await
    }

    /// Feeds one inbound frame through RPC correlation first, then the
    /// handler registry if it was not claimed as an RPC response.
    pub fn handle_inbound(&self, mut envelope: Envelope) {
        envelope.normalize();
        let payload = envelope.payload.clone().unwrap_or(Value::Null);
        if let Some(correlation_id) = envelope.meta.get("correlationId").and_then(Value::as_str) {
            if self.pending.resolve(correlation_id, &envelope.ty, payload.clone()) {
                return;
            }
        }
        self.handlers.dispatch(&envelope.ty, &payload);
    }

    /// Transitions to `closing` then `closed`, fails every pending RPC with
    /// `ConnectionClosed`, and tears down the transport.
    pub async fn close(&self) {
        self.transition(ClientState::Closing);
        self.transport.close().await;
        self.transition(ClientState::Closed);
        self.pending.fail_all_closed();
    }

    pub fn queue_size(&self) -> usize {
        self.queue.size()
    }

    pub fn pending_rpc_count(&self) -> usize {
        self.pending.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfigBuilder;
    use crate::queue::OverflowPolicy;
    use crate::reconnect::ReconnectPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct RecordingTransport {
        connect_ok: std::sync::atomic::AtomicBool,
        sent: Mutex<Vec<Envelope>>,
        fail_sends: std::sync::atomic::AtomicUsize,
    }

    impl RecordingTransport {
        fn new(connect_ok: bool) -> Self {
            Self {
                connect_ok: std::sync::atomic::AtomicBool::new(connect_ok),
                sent: Mutex::new(Vec::new()),
                fail_sends: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn connect(&self) -> Result<(), String> {
            if self.connect_ok.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err("refused".to_string())
            }
        }

        async fn send_frame(&self, frame: Envelope) -> Result<(), String> {
            if self.fail_sends.load(Ordering::SeqCst) > 0 {
                self.fail_sends.fetch_sub(1, Ordering::SeqCst);
                return Err("transport down".to_string());
            }
            self.sent.lock().push(frame);
            Ok(())
        }

        async fn close(&self) {}
    }

    /// Uses the real `SystemClock` rather than [`MockClock`]: `MockClock::sleep`
    /// resolves instantly, which would make every RPC race its timeout branch
    /// and lose immediately. Real time is fine here -- every test below
    /// resolves its request well within milliseconds.
    fn test_config() -> ClientConfig {
        ClientConfigBuilder::new()
            .queue(3, OverflowPolicy::DropOldest)
            .reconnect(ReconnectPolicy::new(Duration::from_millis(1), Duration::from_millis(10)).unwrap())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_open() {
        let transport = Arc::new(RecordingTransport::new(true));
        let client = Client::new(transport, test_config());
        client.connect().await.unwrap();
        assert_eq!(client.state(), ClientState::Open);
        client.connect().await.unwrap();
        assert_eq!(client.state(), ClientState::Open);
    }

    #[tokio::test]
    async fn send_enqueues_while_not_open_and_flushes_on_connect() {
        let transport = Arc::new(RecordingTransport::new(true));
        let client = Client::new(transport.clone(), test_config());
        assert!(client.send("PING", Value::Null).await);
        assert_eq!(client.queue_size(), 1);

        client.connect().await.unwrap();
        assert_eq!(client.queue_size(), 0);
        assert_eq!(transport.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn queue_drop_oldest_under_capacity_pressure() {
        let transport = Arc::new(RecordingTransport::new(true));
        let client = Client::new(transport, test_config());
        for i in 0..5 {
            client.send(format!("m{i}"), Value::Null).await;
        }
        assert_eq!(client.queue_size(), 3);
    }

    #[tokio::test]
    async fn request_resolves_on_matching_inbound_response() {
        let transport = Arc::new(RecordingTransport::new(true));
        let client = Client::new(transport.clone(), test_config());
        client.connect().await.unwrap();

        let descriptor = MessageDescriptor::rpc("PING", MessageDescriptor::event("PONG"));
        let client_for_responder = client.clone();
        let request = tokio::spawn(async move {
            client_for_responder
                .request(&descriptor, serde_json::json!({}), None)
                .await
        });

        // Give the request task a chance to register before we answer it.
        tokio::task::yield_now().await;
        let sent_frame = transport.sent.lock().pop().expect("request frame was sent");
        let correlation_id = sent_frame.meta.get("correlationId").unwrap().as_str().unwrap().to_string();

        let mut response = Envelope::new("PONG").with_payload(serde_json::json!({ "reply": "hi" }));
        response.meta.insert("correlationId".into(), Value::String(correlation_id));
        client.handle_inbound(response);

        let result = request.await.unwrap().unwrap();
        assert_eq!(result["reply"], "hi");
    }

    #[tokio::test]
    async fn close_fails_all_pending_rpcs() {
        let transport = Arc::new(RecordingTransport::new(true));
        let client = Client::new(transport, test_config());
        client.connect().await.unwrap();

        let descriptor = MessageDescriptor::rpc("PING", MessageDescriptor::event("PONG"));
        let client_clone = client.clone();
        let handle = tokio::spawn(async move {
            client_clone.request(&descriptor, Value::Null, None).await
        });
        tokio::task::yield_now().await;

        client.close().await;
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed { .. }));
        assert_eq!(client.state(), ClientState::Closed);
    }

    #[tokio::test]
    async fn reconnect_retries_until_transport_accepts() {
        let transport = Arc::new(RecordingTransport::new(false));
        let client = Client::new(transport.clone(), test_config());
        assert!(client.connect().await.is_err());
        assert_eq!(client.state(), ClientState::Closed);

        transport.connect_ok.store(true, Ordering::SeqCst);
        client.reconnect().await.unwrap();
        assert_eq!(client.state(), ClientState::Open);
    }
}
