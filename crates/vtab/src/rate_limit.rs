//! Token-bucket rate limiting for outbound calls to remote sources.
//!
//! A limiter is shared by every cursor created from one table registration;
//! its token state is the only mutable state cursors share.

// Token counts are tracked as f64 for fractional refill.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Waits until a permit is available and takes it.
    async fn acquire(&self);

    /// Takes a permit if one is available right now.
    fn try_acquire(&self) -> bool;

    /// Currently available permits (approximate).
    fn available(&self) -> usize;
}

/// Waits for a permit unless `cancel` fires first.
///
/// Cancellation is reported as [`Error::Cancelled`] so callers can tell a
/// stopped query apart from a broken source.
pub async fn acquire_permit(limiter: &dyn RateLimiter, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled("rate limit wait canceled".into())),
        _ = limiter.acquire() => Ok(()),
    }
}

/// Tokens refill continuously at `rate` per second up to `capacity`.
///
/// Clones share the same bucket. Time is read from `tokio::time`, so a
/// paused test runtime drives it deterministically.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    rate: f64,
    capacity: usize,
    state: Arc<Mutex<BucketState>>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A bucket that starts full.
    ///
    /// # Panics
    ///
    /// Panics if `rate` is not positive or `capacity` is zero.
    pub fn new(rate: f64, capacity: usize) -> Self {
        assert!(rate > 0.0, "token bucket rate must be positive");
        assert!(capacity > 0, "token bucket capacity must be non-zero");
        Self {
            rate,
            capacity,
            state: Arc::new(Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            })),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity as f64);
        state.last_refill = now;
    }

    /// Takes a token, or returns how long until one is available.
    fn take(&self) -> Option<Duration> {
        let mut state = self.state.lock();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64((1.0 - state.tokens) / self.rate))
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        while let Some(wait) = self.take() {
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limited");
            tokio::time::sleep(wait).await;
        }
    }

    fn try_acquire(&self) -> bool {
        self.take().is_none()
    }

    fn available(&self) -> usize {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens as usize
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}

    fn try_acquire(&self) -> bool {
        true
    }

    fn available(&self) -> usize {
        usize::MAX
    }
}
