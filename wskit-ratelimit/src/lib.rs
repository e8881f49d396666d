//! Token-bucket rate limiting keyed by identity, with an injectable clock
//! so backwards-clock robustness and refill timing are deterministically
//! testable.

pub mod bucket;
pub mod limiter;

pub use bucket::{ConsumeResult, TokenBucket};
pub use limiter::{RateLimitPolicy, RateLimiter};
