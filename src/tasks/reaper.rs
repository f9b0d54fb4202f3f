//! Session Reaper Task
//!
//! Background task that periodically removes expired sessions. Reads treat
//! expired sessions as absent on their own; the reaper bounds storage
//! growth between reads.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::SessionStore;

/// Spawns a background task that periodically reaps expired sessions.
///
/// # Arguments
/// * `store` - Shared session store to reap
/// * `interval_secs` - Seconds between reap passes
///
/// # Returns
/// A JoinHandle used to abort the task during shutdown.
pub fn spawn_session_reaper_task<P>(store: SessionStore<P>, interval_secs: u64) -> JoinHandle<()>
where
    P: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "Starting session reaper task");

        loop {
            tokio::time::sleep(interval).await;

            let reaped = store.reap_expired().await;

            if reaped == 0 {
                debug!("Session reaper found no expired sessions");
            }
        }
    })
}
