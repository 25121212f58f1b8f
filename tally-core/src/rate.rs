use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Steady rate and bucket capacity for a [`RateLimiter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatePolicy {
    pub qps: f64,
    pub burst: u32,
}

impl RatePolicy {
    /// One lookup per second, no bursting.
    pub const ONE_PER_SECOND: RatePolicy = RatePolicy {
        qps: 1.0,
        burst: 1,
    };

    fn limited(&self) -> bool {
        self.qps.is_finite() && self.qps > 0.0
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self::ONE_PER_SECOND
    }
}

/// Token-bucket rate limiter.
///
/// Semantics:
/// - The bucket starts full (`burst` tokens) and refills at `qps`.
/// - `acquire` sleeps until `cost` tokens are available, then takes them.
/// - A deficit is booked immediately (tokens go negative) so back-to-back
///   callers queue up behind each other instead of sharing one refill.
///
/// Time comes from `tokio::time`, so a paused test clock drives it.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RatePolicy,
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            tokens: policy.burst.max(1) as f64,
            last: Instant::now(),
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    /// Returns wait time needed to have `need` tokens available (0 if ready).
    fn needed_wait(&mut self, need: f64, now: Instant) -> Duration {
        if !self.policy.limited() {
            return Duration::ZERO;
        }
        let capacity = self.policy.burst.max(1) as f64;

        // refill
        let dt = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + dt * self.policy.qps).min(capacity);

        let deficit = need - self.tokens;
        self.tokens -= need;
        if deficit <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(deficit / self.policy.qps)
        }
    }

    /// Wait for `cost` tokens. Returns how long the caller was held back.
    pub async fn acquire(&mut self, cost: u32) -> Duration {
        let wait = self.needed_wait(cost as f64, Instant::now());
        if !wait.is_zero() {
            tracing::trace!(target: "rate", wait_ms = wait.as_millis() as u64, "rate.wait");
            sleep(wait).await;
        }
        wait
    }
}
