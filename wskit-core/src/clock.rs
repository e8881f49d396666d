//! Injectable clock abstraction.
//!
//! Rate limiting, reconnect backoff, and RPC timeouts all need a reliable
//! time source, and all need to be testable without sleeping in real time.
//! [`Clock`] is the seam: production code depends on `Arc<dyn Clock>` and
//! is handed a [`SystemClock`]; tests are handed a [`MockClock`] and
//! advance it deterministically.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The future returned by [`Clock::sleep`]. Boxed so [`Clock`] stays
/// object-safe and the concrete executor never leaks into the trait.
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// An injectable source of "now" and "wait until later".
///
/// Implementers must guarantee [`Clock::now_millis`] reflects whatever
/// notion of time the deployment cares about (wall clock, monotonic, or a
/// fully virtual test clock) but need not guarantee monotonicity
/// themselves -- callers such as the token bucket are written to clamp
/// backwards jumps rather than assume they cannot happen.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since an implementation-defined epoch. May go backwards
    /// (e.g. NTP step corrections); callers must not panic if it does.
    fn now_millis(&self) -> i64;

    /// A future that resolves no earlier than `duration` from now.
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// Wall-clock [`Clock`] backed by `std::time` for `now` and `tokio::time`
/// for `sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
            Ok(duration) => duration.as_millis() as i64,
            Err(err) => -(err.duration().as_millis() as i64),
        }
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Deterministic clock for tests: `now_millis` reads an atomic counter that
/// only moves when [`MockClock::advance`] (or [`MockClock::rewind`]) is
/// called, and `sleep` resolves immediately rather than waiting in real
/// time -- tests that need to observe in-flight sleeps should drive them
/// with an explicit notifier instead.
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<AtomicI64>,
}

impl MockClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    /// Moves the clock backwards -- used to exercise the rate limiter's
    /// non-monotonic-clock robustness.
    pub fn rewind(&self, by: Duration) {
        self.millis
            .fetch_sub(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn sleep(&self, _duration: Duration) -> Sleep {
        Box::pin(std::future::ready(()))
    }
}
