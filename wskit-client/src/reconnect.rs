//! Reconnect backoff policy: capped exponential growth plus jitter.
//!
//! The jitter seam mirrors the teacher's injectable-randomness pattern in
//! `governance::retry::adaptive` (a deterministic `mix64`-derived jitter
//! factor, used there so retry-after computations stay reproducible in
//! tests) -- here it is narrowed to a single multiplicative factor so
//! production code can use real randomness while tests pin it down.

use std::time::Duration;

use rand::Rng;

use wskit_core::ConfigError;

/// Governs whether and how the client retries a dropped connection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// `None` means retry indefinitely.
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Result<Self, ConfigError> {
        if base_delay.is_zero() || max_delay < base_delay {
            return Err(ConfigError::InvalidReconnectBounds);
        }
        Ok(Self {
            enabled: true,
            base_delay,
            max_delay,
            max_attempts: None,
        })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            max_attempts: Some(0),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether `attempt` (1-indexed: the first retry is attempt 1) should
    /// still be made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// An injectable source of jitter multipliers, following the same seam the
/// crate uses for time ([`wskit_core::Clock`]): production gets real
/// randomness, tests get a fixed factor.
pub trait Jitter: Send + Sync {
    /// A multiplier in `[0.5, 1.5)` applied to the computed backoff delay.
    fn factor(&mut self) -> f64;
}

/// Uniform jitter in `[0.5, 1.5)` via `rand::thread_rng`.
#[derive(Debug, Default)]
pub struct RandJitter;

impl Jitter for RandJitter {
    fn factor(&mut self) -> f64 {
        rand::thread_rng().gen_range(0.5..1.5)
    }
}

/// Always returns `1.0` -- deterministic backoff for tests that assert on
/// exact delay values.
#[derive(Debug, Default)]
pub struct NullJitter;

impl Jitter for NullJitter {
    fn factor(&mut self) -> f64 {
        1.0
    }
}

/// `base * 2^(attempt - 1)`, capped at `max_delay`, then scaled by one call
/// to `jitter.factor()`. `attempt` is 1-indexed.
pub fn backoff_delay(policy: &ReconnectPolicy, attempt: u32, jitter: &mut dyn Jitter) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let grown = policy
        .base_delay
        .as_millis()
        .saturating_mul(1u128 << exponent);
    let capped = grown.min(policy.max_delay.as_millis());
    let jittered = (capped as f64 * jitter.factor()).round().max(0.0) as u64;
    Duration::from_millis(jittered)
}
