//! Sliding Window Module
//!
//! Rate limiting by exact request timestamps over a trailing interval.
//! Unlike a fixed window there is no boundary burst: the window moves
//! continuously, so at most `limit` requests are admitted in any span of
//! `window` length.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::limiter::Verdict;

// == Sliding Window ==
/// Sliding window rate limiter.
///
/// Invariant: after any allowed call, `hits.len() <= limit` and every
/// retained timestamp is younger than `window`.
#[derive(Debug)]
pub struct SlidingWindow {
    /// Maximum requests admitted per window
    limit: usize,
    /// Trailing interval length
    window: Duration,
    /// Admission timestamps, oldest first
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    // == Constructor ==
    /// Creates a sliding window limiter.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` for a zero limit or zero window.
    pub fn new(limit: usize, window: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidConfig(
                "Sliding window limit must be > 0".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(Error::InvalidConfig(
                "Sliding window duration must be > 0".to_string(),
            ));
        }

        Ok(Self {
            limit,
            window,
            hits: VecDeque::new(),
        })
    }

    /// Creates a window whose limit the caller has already validated.
    /// Used when the adaptive limiter rebuilds its window after retuning.
    pub(crate) fn fresh(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: VecDeque::new(),
        }
    }

    // == Prune ==
    /// Drops timestamps that have left the window.
    fn prune(&mut self, now: Instant) {
        while self
            .hits
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            self.hits.pop_front();
        }
    }

    // == Is Allowed ==
    /// Checks and records one request.
    ///
    /// On denial the verdict's `retry_after` is the time until the oldest
    /// retained request exits the window.
    pub fn is_allowed(&mut self) -> Verdict {
        let now = Instant::now();
        self.prune(now);

        if self.hits.len() < self.limit {
            self.hits.push_back(now);
            Verdict::allow()
        } else {
            // Oldest retained hit is guaranteed present here
            let oldest_age = self
                .hits
                .front()
                .map(|t| now.duration_since(*t))
                .unwrap_or_default();
            Verdict::deny(self.window.saturating_sub(oldest_age))
        }
    }

    // == Occupancy ==
    /// Returns how many admissions currently count against the window,
    /// without consuming one.
    pub fn occupancy(&mut self) -> usize {
        self.prune(Instant::now());
        self.hits.len()
    }

    // == Remaining ==
    /// Returns how many admissions are left in the current window.
    pub fn remaining(&mut self) -> usize {
        self.limit - self.occupancy()
    }

    /// Returns the configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }
}
