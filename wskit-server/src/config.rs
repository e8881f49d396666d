//! Fail-fast server configuration: every policy value is checked at
//! construction, never at serve time -- mirrors the teacher's
//! `ConfigurationBuilder` idiom (`spark-core::configuration`).

use std::sync::Arc;

use wskit_core::{Clock, ConfigError, Logger, NullLogger, SystemClock, Validator};
use wskit_ratelimit::RateLimitPolicy;

/// What the dispatch pipeline does with a frame whose `type` has no
/// registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownRouteBehavior {
    /// Silently drop the frame. Default.
    Drop,
    /// Emit an `UNKNOWN_TYPE` error frame back to the client.
    Emit,
}

impl Default for UnknownRouteBehavior {
    fn default() -> Self {
        UnknownRouteBehavior::Drop
    }
}

/// Top-level server policy, built via [`EngineConfigBuilder`] and
/// validated once at construction.
pub struct EngineConfig {
    pub unknown_route_behavior: UnknownRouteBehavior,
    pub rate_limit: Option<RateLimitPolicy>,
    pub clock: Arc<dyn Clock>,
    pub logger: Arc<dyn Logger>,
    pub validator: Arc<dyn Validator>,
}

/// Builds an [`EngineConfig`], validating the rate-limit policy (if any)
/// up front so an invalid capacity/rate is a [`ConfigError`] raised by
/// [`EngineConfigBuilder::build`], never a failure discovered mid-serve.
pub struct EngineConfigBuilder {
    unknown_route_behavior: UnknownRouteBehavior,
    rate_limit: Option<RateLimitPolicy>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    validator: Arc<dyn Validator>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            unknown_route_behavior: UnknownRouteBehavior::default(),
            rate_limit: None,
            clock: Arc::new(SystemClock),
            logger: Arc::new(NullLogger),
            validator: Arc::new(wskit_core::JsonSchemaValidator),
        }
    }
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown_route_behavior(mut self, behavior: UnknownRouteBehavior) -> Self {
        self.unknown_route_behavior = behavior;
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
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

    pub fn validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        if let Some(policy) = &self.rate_limit {
            if policy.capacity < 1 {
                return Err(ConfigError::InvalidCapacity {
                    capacity: policy.capacity as i64,
                });
            }
            if !(policy.tokens_per_second > 0.0) {
                return Err(ConfigError::InvalidRefillRate {
                    tokens_per_second: policy.tokens_per_second,
                });
            }
        }

        Ok(EngineConfig {
            unknown_route_behavior: self.unknown_route_behavior,
            rate_limit: self.rate_limit,
            clock: self.clock,
            logger: self.logger,
            validator: self.validator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_rate_limit_policy_at_build_time() {
        let err = EngineConfigBuilder::new()
            .rate_limit(RateLimitPolicy::new(0, 1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCapacity { capacity: 0 }));
    }

    #[test]
    fn defaults_to_drop_unknown_routes() {
        let config = EngineConfigBuilder::new().build().unwrap();
        assert_eq!(config.unknown_route_behavior, UnknownRouteBehavior::Drop);
    }
}
