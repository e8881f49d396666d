//! Fail-fast client configuration, mirroring `wskit-server::EngineConfigBuilder`'s
//! validated-at-construction idiom.

use std::sync::Arc;
use std::time::Duration;

use wskit_core::{Clock, ConfigError, Logger, NullLogger, SystemClock};

use crate::queue::OverflowPolicy;
use crate::reconnect::ReconnectPolicy;

#[derive(Clone)]
pub struct ClientConfig {
    pub queue_capacity: usize,
    pub queue_policy: OverflowPolicy,
    pub reconnect: ReconnectPolicy,
    pub default_rpc_timeout: Duration,
    pub clock: Arc<dyn Clock>,
    pub logger: Arc<dyn Logger>,
}

pub struct ClientConfigBuilder {
    queue_capacity: usize,
    queue_policy: OverflowPolicy,
    reconnect: ReconnectPolicy,
    default_rpc_timeout: Duration,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            queue_policy: OverflowPolicy::DropOldest,
            reconnect: ReconnectPolicy::new(Duration::from_millis(250), Duration::from_secs(30))
                .expect("default reconnect bounds are valid"),
            default_rpc_timeout: crate::pending_rpc::DEFAULT_RPC_TIMEOUT,
            clock: Arc::new(SystemClock),
            logger: Arc::new(NullLogger),
        }
    }
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(mut self, capacity: usize, policy: OverflowPolicy) -> Self {
        self.queue_capacity = capacity;
        self.queue_policy = policy;
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn default_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.default_rpc_timeout = timeout;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        if self.queue_policy != OverflowPolicy::Off && self.queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity {
                capacity: self.queue_capacity,
            });
        }

        Ok(ClientConfig {
            queue_capacity: self.queue_capacity,
            queue_policy: self.queue_policy,
            reconnect: self.reconnect,
            default_rpc_timeout: self.default_rpc_timeout,
            clock: self.clock,
            logger: self.logger,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_builder_produces_valid_config() {
        let config = ClientConfigBuilder::new().build().unwrap();
        assert_eq!(config.queue_capacity, 256);
    }

    #[test]
    fn zero_capacity_rejected_unless_policy_is_off() {
        let err = ClientConfigBuilder::new()
            .queue(0, OverflowPolicy::DropOldest)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidQueueCapacity { capacity: 0 }));

        assert!(
            ClientConfigBuilder::new()
                .queue(0, OverflowPolicy::Off)
                .build()
                .is_ok()
        );
    }
}
