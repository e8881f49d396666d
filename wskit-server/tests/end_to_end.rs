use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use wskit_pubsub::{PubSubDriver, PublishOptions};
use wskit_server::{ConnectionContext, Outbound};

async fn recv_frame(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> serde_json::Value {
    match rx.recv().await.expect("an outbound frame") {
        Outbound::Frame(envelope) => serde_json::to_value(&envelope).unwrap(),
        Outbound::Close(close) => panic!("expected a frame, got a close: {close:?}"),
    }
}

#[tokio::test]
async fn echo_scenario() {
    let harness = wskit_server::tests_support::echo_harness();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ctx = ConnectionContext::new("client-1".into(), tx, harness.pubsub.clone(), Arc::new(harness.clock));

    harness
        .engine
        .dispatch(&mut ctx, json!({ "type": "PING", "payload": { "text": "Hi" } }))
        .await;

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "PONG");
    assert_eq!(frame["payload"]["reply"], "Pong: Hi");
    assert!(frame["meta"]["timestamp"].is_number());
}

#[tokio::test]
async fn validation_rejection_scenario() {
    let harness = wskit_server::tests_support::echo_harness();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ctx = ConnectionContext::new("client-1".into(), tx, harness.pubsub.clone(), Arc::new(harness.clock));

    harness
        .engine
        .dispatch(
            &mut ctx,
            json!({ "type": "AUTH", "payload": { "token": "not-a-jwt" } }),
        )
        .await;

    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "VALIDATION_FAILED");
    assert!(!frame["payload"]["issues"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rate_limit_scenario() {
    let harness = wskit_server::tests_support::rate_limited_harness(10, 1.0);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ctx = ConnectionContext::new(
        "client-1".into(),
        tx,
        harness.pubsub.clone(),
        Arc::new(harness.clock.clone()),
    );

    for _ in 0..10 {
        harness
            .engine
            .dispatch(&mut ctx, json!({ "type": "PING", "payload": { "text": "Hi" } }))
            .await;
        let frame = recv_frame(&mut rx).await;
        assert_eq!(frame["type"], "PONG");
    }

    harness
        .engine
        .dispatch(&mut ctx, json!({ "type": "PING", "payload": { "text": "Hi" } }))
        .await;
    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "RESOURCE_EXHAUSTED");
    assert!((frame["payload"]["retryAfterMs"].as_f64().unwrap() - 1000.0).abs() < 1.0);
}

#[tokio::test]
async fn clock_backwards_still_bounds_tokens_correctly() {
    let harness = wskit_server::tests_support::rate_limited_harness(10, 1.0);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let clock = harness.clock.clone();
    let mut ctx = ConnectionContext::new("client-1".into(), tx, harness.pubsub.clone(), Arc::new(clock.clone()));

    for _ in 0..5 {
        harness
            .engine
            .dispatch(&mut ctx, json!({ "type": "PING", "payload": { "text": "Hi" } }))
            .await;
        let _ = recv_frame(&mut rx).await;
    }

    clock.rewind(std::time::Duration::from_secs(1));

    harness
        .engine
        .dispatch(&mut ctx, json!({ "type": "PING", "payload": { "text": "Hi" } }))
        .await;
    let frame = recv_frame(&mut rx).await;
    assert_eq!(frame["type"], "PONG");
}

#[tokio::test]
async fn pubsub_fan_out_scenario() {
    let pubsub = Arc::new(wskit_pubsub::MemoryDriver::new());
    pubsub.subscribe("sub-1", "room:1");
    pubsub.subscribe("sub-2", "room:1");
    pubsub.subscribe("bystander", "room:2");

    let outcome = pubsub
        .publish(
            wskit_pubsub::PublishEnvelope::new("room:1", "MSG", json!({ "text": "hi" })),
            PublishOptions::default(),
        )
        .await;

    assert_eq!(outcome.matched_local, Some(2));
    let subscribers = pubsub.get_subscribers("room:1");
    assert!(subscribers.contains(&"sub-1".to_string()));
    assert!(subscribers.contains(&"sub-2".to_string()));
    assert!(!subscribers.contains(&"bystander".to_string()));
}
