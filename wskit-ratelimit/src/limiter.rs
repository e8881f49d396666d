//! Keyed rate limiter: one [`TokenBucket`] per identity, guarded by a
//! per-key lock so distinct keys never contend -- grounded in the
//! teacher's `DashMap`-backed concurrent store pattern
//! (`spark-switch::core::session_manager`).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use wskit_core::{Clock, ConfigError};

use crate::bucket::{ConsumeResult, TokenBucket};

/// Construction-time policy: capacity, refill rate, and an optional key
/// prefix so two limiters sharing a backing store stay isolated.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub capacity: u32,
    pub tokens_per_second: f64,
    pub prefix: Option<String>,
}

impl RateLimitPolicy {
    pub fn new(capacity: u32, tokens_per_second: f64) -> Self {
        Self {
            capacity,
            tokens_per_second,
            prefix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 1 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity as i64,
            });
        }
        if !(self.tokens_per_second > 0.0) {
            return Err(ConfigError::InvalidRefillRate {
                tokens_per_second: self.tokens_per_second,
            });
        }
        Ok(())
    }
}

/// A token-bucket rate limiter keyed by an arbitrary caller-supplied
/// identity string (e.g. client id, user id, IP). Construction validates
/// the policy so an invalid capacity/rate is a [`ConfigError`] at setup,
/// never a failure at serve time.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    buckets: DashMap<String, Mutex<TokenBucket>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self {
            policy,
            clock,
            buckets: DashMap::new(),
        })
    }

    fn prefixed(&self, key: &str) -> String {
        match &self.policy.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }

    /// Consumes `n` tokens from `key`'s bucket, creating a fresh full
    /// bucket on first use. Holds only that key's lock; unrelated keys are
    /// never blocked.
    pub fn consume(&self, key: &str, n: u32) -> ConsumeResult {
        let prefixed = self.prefixed(key);
        let now = self.clock.now_millis();
        let entry = self
            .buckets
            .entry(prefixed)
            .or_insert_with(|| Mutex::new(TokenBucket::new(self.policy.capacity, self.policy.tokens_per_second, now)));
        entry.lock().consume(n, now)
    }

    /// Removes every bucket whose last refill happened more than
    /// `idle_for` ago, so long-lived servers don't accumulate one bucket
    /// per ever-seen key forever. Bookkeeping only -- never invoked as
    /// part of `consume`.
    pub fn sweep(&self, idle_for: Duration) {
        let cutoff = self.clock.now_millis() - idle_for.as_millis() as i64;
        self.buckets
            .retain(|_, bucket| bucket.lock().last_refill_millis() >= cutoff);
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
