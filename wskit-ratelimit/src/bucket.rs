//! The token bucket itself: pure state plus the refill/consume arithmetic.
//! No locking and no clock lookups live here -- [`crate::limiter::RateLimiter`]
//! owns the per-key lock and supplies `now`.

/// `{ tokens, capacity, refillPerSec, lastRefillMillis }`. Invariant:
/// `0 <= tokens <= capacity` holds after every [`TokenBucket::consume`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucket {
    tokens: f64,
    capacity: u32,
    refill_per_sec: f64,
    last_refill_millis: i64,
}

/// The result of one [`TokenBucket::consume`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeResult {
    pub allowed: bool,
    pub remaining: u32,
    pub retry_after_ms: Option<u64>,
}

impl TokenBucket {
    /// A full bucket, last refilled at `now_millis`.
    pub fn new(capacity: u32, refill_per_sec: f64, now_millis: i64) -> Self {
        Self {
            tokens: capacity as f64,
            capacity,
            refill_per_sec,
            last_refill_millis: now_millis,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill_millis(&self) -> i64 {
        self.last_refill_millis
    }

    /// Refills for elapsed time (clamped to zero on a backwards clock, in
    /// which case `lastRefillMillis` is left untouched) then attempts to
    /// withdraw `n` tokens.
    pub fn consume(&mut self, n: u32, now_millis: i64) -> ConsumeResult {
        let elapsed_ms = now_millis - self.last_refill_millis;
        if elapsed_ms > 0 {
            let elapsed_secs = elapsed_ms as f64 / 1000.0;
            self.tokens = (self.tokens + elapsed_secs * self.refill_per_sec).min(self.capacity as f64);
            self.last_refill_millis = now_millis;
        }

        let n = n as f64;
        if self.tokens >= n {
            self.tokens -= n;
            ConsumeResult {
                allowed: true,
                remaining: self.tokens.floor() as u32,
                retry_after_ms: None,
            }
        } else {
            let deficit = n - self.tokens;
            let retry_after_ms = (deficit * 1000.0 / self.refill_per_sec).ceil() as u64;
            ConsumeResult {
                allowed: false,
                remaining: self.tokens.floor() as u32,
                retry_after_ms: Some(retry_after_ms),
            }
        }
    }
}
