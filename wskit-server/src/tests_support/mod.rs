//! Fixtures shared between this crate's unit tests and the `tests/`
//! integration suite: the seed descriptors and handlers from the design
//! notes' end-to-end scenarios, and a small builder for an [`Engine`] wired
//! to a [`wskit_pubsub::MemoryDriver`] and a [`wskit_core::MockClock`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use wskit_core::{
    CapturingLogger, Clock, FieldKind, FieldSchema, JsonSchemaValidator, MessageDescriptor, MockClock,
    PayloadSchema,
};
use wskit_pubsub::MemoryDriver;
use wskit_ratelimit::{RateLimitPolicy, RateLimiter};
use wskit_router::{Handler, Router};

use crate::config::UnknownRouteBehavior;
use crate::context::ConnectionContext;
use crate::dispatch::Engine;

pub fn ping_descriptor() -> MessageDescriptor {
    MessageDescriptor::rpc(
        "PING",
        MessageDescriptor::event("PONG").with_payload_schema(PayloadSchema::new(
            vec![FieldSchema::new("reply", FieldKind::String)],
            vec![],
        )),
    )
    .with_payload_schema(PayloadSchema::new(
        vec![FieldSchema::new("text", FieldKind::String)],
        vec![],
    ))
}

pub fn auth_descriptor() -> MessageDescriptor {
    MessageDescriptor::event("AUTH").with_payload_schema(PayloadSchema::new(
        vec![FieldSchema::new("token", FieldKind::JwtLike)],
        vec![],
    ))
}

/// Replies to `PING{text}` with `PONG{reply: "Pong: <text>"}` -- the echo
/// scenario.
pub struct EchoHandler;

#[async_trait]
impl Handler<ConnectionContext> for EchoHandler {
    async fn call(&self, ctx: &mut ConnectionContext, payload: Value) -> Result<(), String> {
        let text = payload
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing text".to_string())?;
        ctx.send("PONG", json!({ "reply": format!("Pong: {text}") }));
        Ok(())
    }
}

/// A handler that must never be invoked (used to assert validation/rate
/// limiting rejected the frame before dispatch).
pub struct UnreachableHandler;

#[async_trait]
impl Handler<ConnectionContext> for UnreachableHandler {
    async fn call(&self, _ctx: &mut ConnectionContext, _payload: Value) -> Result<(), String> {
        panic!("handler must not be invoked for a rejected frame");
    }
}

/// Bundles an [`Engine`], the [`MemoryDriver`] it was wired to, its
/// [`MockClock`], and a [`CapturingLogger`] for assertions.
pub struct TestHarness {
    pub engine: Engine,
    pub pubsub: Arc<MemoryDriver>,
    pub clock: MockClock,
    pub logger: CapturingLogger,
}

pub fn echo_harness() -> TestHarness {
    let router = Router::new();
    router
        .register(ping_descriptor(), Arc::new(EchoHandler), vec![])
        .unwrap();
    router
        .register(auth_descriptor(), Arc::new(UnreachableHandler), vec![])
        .unwrap();

    let clock = MockClock::new(0);
    let logger = CapturingLogger::new();
    let engine = Engine::new(
        Arc::new(router),
        None,
        Arc::new(JsonSchemaValidator),
        Arc::new(logger.clone()),
        UnknownRouteBehavior::Emit,
    );

    TestHarness {
        engine,
        pubsub: Arc::new(MemoryDriver::new()),
        clock,
        logger,
    }
}

pub fn rate_limited_harness(capacity: u32, tokens_per_second: f64) -> TestHarness {
    let router = Router::new();
    router
        .register(ping_descriptor(), Arc::new(EchoHandler), vec![])
        .unwrap();

    let clock = MockClock::new(0);
    let clock_dyn: Arc<dyn Clock> = Arc::new(clock.clone());
    let limiter = RateLimiter::new(RateLimitPolicy::new(capacity, tokens_per_second), clock_dyn).unwrap();
    let logger = CapturingLogger::new();
    let engine = Engine::new(
        Arc::new(router),
        Some(Arc::new(limiter)),
        Arc::new(JsonSchemaValidator),
        Arc::new(logger.clone()),
        UnknownRouteBehavior::Emit,
    );

    TestHarness {
        engine,
        pubsub: Arc::new(MemoryDriver::new()),
        clock,
        logger,
    }
}
