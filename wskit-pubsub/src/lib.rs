//! Subscription index plus a pluggable publish/subscribe driver contract,
//! with memory, broker, and per-topic-sharded implementations.

pub mod broker;
pub mod driver;
pub mod error;
pub mod index;
pub mod memory;
pub mod sharded;

pub use broker::{BrokerDriver, BrokerTransport};
pub use driver::{Capability, PubSubDriver, PublishEnvelope, PublishOptions, PublishOutcome};
pub use error::PubSubError;
pub use index::{ReplaceDelta, SubscriptionIndex};
pub use memory::MemoryDriver;
pub use sharded::{ShardTransport, ShardedDriver, shard_key_for_topic};
