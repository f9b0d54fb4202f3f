//! Adaptive Rate Limiter Module
//!
//! A sliding window whose limit is retuned periodically from downstream
//! health: recorded response latencies and error rates shrink or grow the
//! admitted rate between a floor and a ceiling. Callers report outcomes via
//! `record_response`; the retune itself runs from the background adjuster
//! task.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Error, Result};
use crate::limiter::{DenyReason, SlidingWindow, Verdict};

// == Adaptive Config ==
/// Tuning parameters for the adaptive limiter.
///
/// The thresholds and multipliers are deployment-specific knobs; the
/// defaults are starting points, not requirements.
#[derive(Debug, Clone)]
pub struct AdaptiveConfig {
    /// Limit the window starts at
    pub base_limit: usize,
    /// Window span the limit applies to
    pub window: Duration,
    /// Floor the limit never shrinks below
    pub min_limit: usize,
    /// Ceiling the limit never grows above
    pub max_limit: usize,
    /// Error rate above which the limit shrinks
    pub error_rate_shrink: f64,
    /// Error rate below which (with fast responses) the limit grows
    pub error_rate_grow: f64,
    /// Mean latency above which the limit shrinks
    pub latency_shrink: Duration,
    /// Mean latency below which (with few errors) the limit grows
    pub latency_grow: Duration,
    /// Multiplier applied when shrinking due to errors
    pub shrink_on_errors: f64,
    /// Multiplier applied when shrinking due to latency
    pub shrink_on_latency: f64,
    /// Multiplier applied when growing
    pub grow_factor: f64,
    /// How many recent latency samples to keep
    pub sample_capacity: usize,
}

impl AdaptiveConfig {
    // == Constructor ==
    /// Builds a config around a base limit, deriving the floor as a tenth
    /// of the base (at least 1) and the ceiling as three times the base.
    pub fn new(base_limit: usize) -> Self {
        Self {
            base_limit,
            window: Duration::from_secs(60),
            min_limit: (base_limit / 10).max(1),
            max_limit: base_limit * 3,
            error_rate_shrink: 0.10,
            error_rate_grow: 0.01,
            latency_shrink: Duration::from_secs(2),
            latency_grow: Duration::from_millis(500),
            shrink_on_errors: 0.8,
            shrink_on_latency: 0.9,
            grow_factor: 1.1,
            sample_capacity: 100,
        }
    }

    // == Validate ==
    fn validate(&self) -> Result<()> {
        if self.base_limit == 0 || self.min_limit == 0 {
            return Err(Error::InvalidConfig(
                "Adaptive limits must be > 0".to_string(),
            ));
        }
        if self.min_limit > self.base_limit || self.base_limit > self.max_limit {
            return Err(Error::InvalidConfig(
                "Adaptive limits must satisfy min <= base <= max".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(Error::InvalidConfig(
                "Adaptive window must be > 0".to_string(),
            ));
        }
        if self.sample_capacity == 0 {
            return Err(Error::InvalidConfig(
                "Adaptive sample capacity must be > 0".to_string(),
            ));
        }
        if self.shrink_on_errors <= 0.0
            || self.shrink_on_errors >= 1.0
            || self.shrink_on_latency <= 0.0
            || self.shrink_on_latency >= 1.0
            || self.grow_factor <= 1.0
        {
            return Err(Error::InvalidConfig(
                "Adaptive multipliers must shrink below 1.0 and grow above 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

// == Inner State ==
#[derive(Debug)]
struct AdaptiveInner {
    config: AdaptiveConfig,
    current_limit: usize,
    window: SlidingWindow,
    /// Recent response latencies, bounded by `sample_capacity`
    latencies: VecDeque<Duration>,
    error_count: u64,
    success_count: u64,
}

// == Adaptive Rate Limiter ==
/// Self-tuning admission control.
///
/// Cloning is cheap and shares the limiter state.
#[derive(Debug, Clone)]
pub struct AdaptiveRateLimiter {
    inner: Arc<Mutex<AdaptiveInner>>,
}

impl AdaptiveRateLimiter {
    // == Constructor ==
    /// Creates an adaptive limiter from a validated config.
    pub fn new(config: AdaptiveConfig) -> Result<Self> {
        config.validate()?;

        let window = SlidingWindow::fresh(config.base_limit, config.window);
        Ok(Self {
            inner: Arc::new(Mutex::new(AdaptiveInner {
                current_limit: config.base_limit,
                window,
                latencies: VecDeque::new(),
                error_count: 0,
                success_count: 0,
                config,
            })),
        })
    }

    // == Is Allowed ==
    /// Checks and records one request against the current window.
    pub async fn is_allowed(&self) -> Verdict {
        let mut inner = self.inner.lock().await;
        inner
            .window
            .is_allowed()
            .labelled(DenyReason::SystemThrottle)
    }

    // == Record Response ==
    /// Feeds one downstream outcome into the tuning metrics.
    pub async fn record_response(&self, latency: Duration, success: bool) {
        let mut inner = self.inner.lock().await;

        if inner.latencies.len() >= inner.config.sample_capacity {
            inner.latencies.pop_front();
        }
        inner.latencies.push_back(latency);

        if success {
            inner.success_count += 1;
        } else {
            inner.error_count += 1;
        }
    }

    // == Retune ==
    /// Recomputes the limit from the metrics gathered since the last call.
    ///
    /// Called periodically by the background adjuster. Returns the limit in
    /// effect afterwards. With no latency samples the limit is left alone.
    pub async fn retune(&self) -> usize {
        let mut inner = self.inner.lock().await;

        if inner.latencies.is_empty() {
            return inner.current_limit;
        }

        let mean_latency =
            inner.latencies.iter().sum::<Duration>() / inner.latencies.len() as u32;
        let total = (inner.error_count + inner.success_count).max(1);
        let error_rate = inner.error_count as f64 / total as f64;

        // Counters restart each tuning period; the latency sample persists
        inner.error_count = 0;
        inner.success_count = 0;

        let cfg = &inner.config;
        let previous = inner.current_limit;
        let new_limit = if error_rate > cfg.error_rate_shrink {
            scale(previous, cfg.shrink_on_errors).max(cfg.min_limit)
        } else if mean_latency > cfg.latency_shrink {
            scale(previous, cfg.shrink_on_latency).max(cfg.min_limit)
        } else if error_rate < cfg.error_rate_grow && mean_latency < cfg.latency_grow {
            scale(previous, cfg.grow_factor).min(cfg.max_limit)
        } else {
            previous
        };

        if new_limit != previous {
            info!(
                previous,
                new_limit,
                error_rate,
                mean_latency_ms = mean_latency.as_millis() as u64,
                "Adaptive rate limit retuned"
            );
            inner.window = SlidingWindow::fresh(new_limit, inner.config.window);
            inner.current_limit = new_limit;
        }

        inner.current_limit
    }

    // == Current Limit ==
    /// Returns the limit currently in effect.
    pub async fn current_limit(&self) -> usize {
        self.inner.lock().await.current_limit
    }
}

/// Scales a limit by a multiplier, truncating like integer arithmetic.
fn scale(limit: usize, factor: f64) -> usize {
    (limit as f64 * factor) as usize
}
