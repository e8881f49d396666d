//! Single-crate facade: re-exports every sub-crate's public surface so
//! application code depends on one crate rather than wiring up
//! `wskit-core`, `wskit-router`, `wskit-ratelimit`, `wskit-pubsub`,
//! `wskit-server`, `wskit-client`, and `wskit-serve` individually.
//!
//! Mirrors the teacher's top-level aggregation convention of re-exporting
//! a crate's submodules at the root rather than asking callers to reach
//! into each one by path.

pub use wskit_core as core;

pub use wskit_client as client;
pub use wskit_pubsub as pubsub;
pub use wskit_ratelimit as ratelimit;
pub use wskit_router as router;
pub use wskit_serve as serve;
pub use wskit_server as server;

pub use wskit_core::{
    is_reserved_meta_key, BadEnvelopeShape, CapturingLogger, ClientError, Clock, CloseError,
    ConfigError, Envelope, FieldKind, FieldSchema, JsonSchemaValidator, LogRecord, LogSeverity,
    Logger, MessageDescriptor, MessageKind, MockClock, NullLogger, PayloadSchema, RESERVED_META_KEYS,
    SystemClock, TracingLogger, ValidationIssue, ValidationOutcome, Validator, WireError, WsKitError,
};
pub use wskit_core::close_codes;

pub use wskit_router::{
    run_middleware_chain, DuplicateRoute, Handler, LifecycleHook, Middleware, MiddlewareOutcome,
    OnConflict, RouteEntry, RouteTable, Router,
};

pub use wskit_ratelimit::{ConsumeResult, RateLimitPolicy, RateLimiter, TokenBucket};

pub use wskit_pubsub::{
    shard_key_for_topic, BrokerDriver, BrokerTransport, Capability, MemoryDriver, PubSubDriver,
    PubSubError, PublishEnvelope, PublishOptions, PublishOutcome, ReplaceDelta, ShardedDriver,
    ShardTransport, SubscriptionIndex,
};

pub use wskit_server::{
    spawn_connection, ConnectionContext, ConnectionHandle, Engine, EngineConfig, EngineConfigBuilder,
    Outbound, UnknownRouteBehavior,
};

pub use wskit_client::{
    backoff_delay, extract_type, Client, ClientConfig, ClientConfigBuilder, ClientState, HandlerRegistry,
    Jitter, NullJitter, OutboundQueue, OverflowEvent, OverflowPolicy, PendingRpcRegistry, RandJitter,
    ReconnectPolicy, Transport, Unsubscribe, DEFAULT_RPC_TIMEOUT,
};

pub use wskit_serve::{
    resolve_runtime, resolve_runtime_from_env, AsyncStdProbe, DetectError, RuntimeKind, RuntimeProbe,
    TokioProbe, WasmEdgeProbe,
};
