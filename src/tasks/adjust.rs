//! Rate Adjuster Task
//!
//! Background task that periodically retunes the adaptive rate limiter from
//! the response metrics recorded since the previous pass.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::limiter::AdaptiveRateLimiter;

/// Spawns a background task that periodically retunes the adaptive limiter.
///
/// # Arguments
/// * `limiter` - Shared adaptive limiter to retune
/// * `interval_secs` - Seconds between tuning passes
///
/// # Returns
/// A JoinHandle used to abort the task during shutdown.
pub fn spawn_rate_adjust_task(
    limiter: AdaptiveRateLimiter,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "Starting adaptive rate adjuster task");

        loop {
            tokio::time::sleep(interval).await;

            let limit = limiter.retune().await;
            debug!(limit, "Adaptive limit after tuning pass");
        }
    })
}
