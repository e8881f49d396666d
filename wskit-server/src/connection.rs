//! Per-connection lifecycle: a dedicated task draining one inbound
//! channel realizes the per-connection FIFO ordering guarantee (the
//! *n*-th frame finishes its handler pipeline before the (*n+1*)-th
//! begins), while many connections run concurrently as separate tasks.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use wskit_core::Clock;
use wskit_pubsub::PubSubDriver;

use crate::context::{ConnectionContext, Outbound};
use crate::dispatch::Engine;

/// A handle to a running connection task: push raw inbound frames onto it,
/// and read its id.
pub struct ConnectionHandle {
    client_id: String,
    inbound: mpsc::UnboundedSender<Value>,
}

impl ConnectionHandle {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Enqueues a raw inbound frame for dispatch. Returns `false` if the
    /// connection task has already exited.
    pub fn push_frame(&self, raw: Value) -> bool {
        self.inbound.send(raw).is_ok()
    }
}

/// Starts a connection: runs every registered `onOpen` hook, then drains
/// inbound frames one at a time through `engine.dispatch`, then on channel
/// close runs `unsubscribe_all` followed by every `onClose` hook.
///
/// Returns the [`ConnectionHandle`] used to feed frames in, and the
/// outbound channel the transport layer drains to actually write bytes
/// (out of scope here -- this crate does not touch sockets).
pub fn spawn_connection(
    engine: Engine,
    pubsub: Arc<dyn PubSubDriver>,
    clock: Arc<dyn Clock>,
) -> (ConnectionHandle, mpsc::UnboundedReceiver<Outbound>) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Value>();

    let mut ctx = ConnectionContext::new(client_id.clone(), outbound_tx, pubsub, clock);
    let router = engine.router().clone();

    tokio::spawn(async move {
        for hook in router.open_hooks() {
            hook.call(&mut ctx).await;
        }
        while let Some(raw) = inbound_rx.recv().await {
            engine.dispatch(&mut ctx, raw).await;
        }
        ctx.unsubscribe_all();
        for hook in router.close_hooks() {
            hook.call(&mut ctx).await;
        }
    });

    (
        ConnectionHandle {
            client_id,
            inbound: inbound_tx,
        },
        outbound_rx,
    )
}
