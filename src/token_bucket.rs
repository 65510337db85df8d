//! Token bucket: the reference [`Algorithm`].

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::algorithm::{sort_key, Algorithm};
use crate::clock::{Clock, SystemClock};
use crate::error::RateLimitError;

fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// A token bucket with continuous refill.
///
/// The bucket holds up to `max_tokens` and refills at `refill_rate` tokens per
/// second, fractionally, whenever it is observed. A reservation consumes tokens
/// if enough are available; otherwise the caller gets a wait estimate for when
/// the missing tokens will have accrued.
///
/// State round-trips through serde for remote backends; the injected clock is
/// not part of the state and deserializes to the system clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill_time: SystemTime,
    #[serde(skip, default = "default_clock")]
    clock: Arc<dyn Clock>,
}

impl PartialEq for TokenBucket {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
            && self.max_tokens == other.max_tokens
            && self.refill_rate == other.refill_rate
            && self.last_refill_time == other.last_refill_time
    }
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// # Panics
    ///
    /// Panics if `max_tokens` or `refill_rate` is not strictly positive.
    pub fn new(max_tokens: f64, refill_rate: f64) -> Self {
        assert!(max_tokens > 0.0, "max_tokens must be > 0");
        assert!(refill_rate > 0.0, "refill_rate must be > 0");
        let clock = default_clock();
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate,
            last_refill_time: clock.now(),
            clock,
        }
    }

    /// Override the clock (useful for deterministic tests). Resets
    /// `last_refill_time` to the new clock's current instant.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.last_refill_time = clock.now();
        self.clock = clock;
        self
    }

    /// Tokens currently available, as of the last refill.
    pub fn available_tokens(&self) -> f64 {
        self.tokens
    }

    /// The bucket's capacity.
    pub fn max_tokens(&self) -> f64 {
        self.max_tokens
    }

    /// Refill rate in tokens per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    fn refill(&mut self) {
        let now = self.clock.now();
        // A clock that moved backwards must not drain the bucket or rewind
        // last_refill_time; skip the refill until the clock catches up.
        if let Ok(elapsed) = now.duration_since(self.last_refill_time) {
            let added = self.refill_rate * elapsed.as_secs_f64();
            self.tokens = (self.tokens + added).min(self.max_tokens);
            self.last_refill_time = now;
        }
    }

    fn wait_for(&self, tokens: f64) -> Duration {
        let missing = (tokens - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / self.refill_rate)
    }
}

impl Algorithm for TokenBucket {
    fn reserve(&mut self, tokens: f64) -> Result<(), RateLimitError> {
        if tokens > self.max_tokens {
            return Err(RateLimitError::OutOfBounds {
                requested: tokens,
                max_tokens: self.max_tokens,
            });
        }

        self.refill();
        if tokens > self.tokens {
            return Err(RateLimitError::TooManyRequests { retry_after: self.wait_for(tokens) });
        }

        self.tokens -= tokens;

        Ok(())
    }

    fn sort_value(&self) -> String {
        sort_key(self.expire_at())
    }

    fn expire_at(&self) -> SystemTime {
        // The instant at which the bucket would be full again, i.e. when this
        // state carries no more information than a fresh one.
        self.clock.now() + self.wait_for(self.max_tokens)
    }
}
