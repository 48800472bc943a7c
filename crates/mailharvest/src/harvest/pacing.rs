//! Spacing between consecutive batches so the provider's request-rate ceiling
//! is not exceeded.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::PacingConfig;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Awaited after every batch except the last. `completed` is the number
    /// of requests the finished batch issued. Returns how long it waited.
    async fn between_batches(&self, completed: usize) -> Duration;
}

/// Never waits.
pub struct NoDelay;

#[async_trait]
impl RateLimiter for NoDelay {
    async fn between_batches(&self, _completed: usize) -> Duration {
        Duration::ZERO
    }
}

/// Waits the same amount after every batch.
pub struct FixedDelay(pub Duration);

#[async_trait]
impl RateLimiter for FixedDelay {
    async fn between_batches(&self, _completed: usize) -> Duration {
        tokio::time::sleep(self.0).await;
        self.0
    }
}

/// Continuous-refill token bucket. Each request consumes one token; when a
/// batch overdraws the bucket, the limiter sleeps until the deficit is refilled.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Takes `requests` tokens and returns the wait needed to pay off any debt.
    fn consume(&self, requests: usize) -> Duration {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;
        state.tokens -= requests as f64;

        if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.refill_per_sec)
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn between_batches(&self, completed: usize) -> Duration {
        let wait = self.consume(completed);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        wait
    }
}

pub fn limiter_from_config(config: &PacingConfig) -> Box<dyn RateLimiter> {
    match config {
        PacingConfig::None => Box::new(NoDelay),
        PacingConfig::Fixed { delay_ms } => Box::new(FixedDelay(Duration::from_millis(*delay_ms))),
        PacingConfig::TokenBucket {
            capacity,
            refill_per_sec,
        } => Box::new(TokenBucket::new(*capacity, *refill_per_sec)),
    }
}
