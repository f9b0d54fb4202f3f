//! Cache Sweep Task
//!
//! Background task that periodically purges TTL-expired cache entries from
//! every tier. Reads self-check expiry, so this sweep only keeps storage
//! from accumulating dead entries between reads.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task sleeps for the given interval between sweeps and takes each
/// tier's lock only for the duration of its purge.
///
/// # Arguments
/// * `manager` - Shared cache manager to sweep
/// * `interval_secs` - Seconds between sweeps
///
/// # Returns
/// A JoinHandle used to abort the task during shutdown.
pub fn spawn_cache_sweep_task<V>(manager: CacheManager<V>, interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "Starting cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = manager.purge_expired().await;

            if removed > 0 {
                info!(removed, "Cache sweep removed expired entries");
            } else {
                debug!("Cache sweep found no expired entries");
            }
        }
    })
}
