//! Token Bucket Module
//!
//! Rate limiting via a bucket that drains on each request and refills
//! continuously over time. Smooths sustained load while allowing short
//! spikes up to the bucket capacity.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::limiter::Verdict;

// == Token Bucket ==
/// Token bucket rate limiter.
///
/// Tokens refill lazily on every call, so no background timer is needed.
/// Invariant: `0 <= tokens <= capacity` at all times.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens the bucket holds
    capacity: u32,
    /// Tokens refilled per second
    refill_rate: f64,
    /// Currently available tokens
    tokens: f64,
    /// When the bucket was last refilled
    last_refill: Instant,
}

impl TokenBucket {
    // == Constructor ==
    /// Creates a full bucket.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of tokens in the bucket
    /// * `refill_rate` - Tokens refilled per second
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` for a zero capacity or a non-positive
    /// refill rate.
    pub fn new(capacity: u32, refill_rate: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "Token bucket capacity must be > 0".to_string(),
            ));
        }
        if refill_rate <= 0.0 || !refill_rate.is_finite() {
            return Err(Error::InvalidConfig(
                "Token bucket refill rate must be positive".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            refill_rate,
            tokens: capacity as f64,
            last_refill: Instant::now(),
        })
    }

    // == Refill ==
    /// Adds tokens for the time elapsed since the last refill, capped at
    /// capacity.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity as f64);
        self.last_refill = now;
    }

    // == Consume ==
    /// Tries to consume `n` tokens.
    ///
    /// On failure the verdict's `retry_after` is the time until the missing
    /// tokens will have refilled.
    pub fn consume(&mut self, n: u32) -> Verdict {
        self.refill();

        let needed = n as f64;
        if self.tokens >= needed {
            self.tokens -= needed;
            Verdict::allow()
        } else {
            let missing = needed - self.tokens;
            Verdict::deny(Duration::from_secs_f64(missing / self.refill_rate))
        }
    }

    // == Is Allowed ==
    /// Tries to consume a single token.
    pub fn is_allowed(&mut self) -> Verdict {
        self.consume(1)
    }

    // == Available ==
    /// Returns the token count after refilling.
    pub fn available(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    /// Returns the bucket capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
