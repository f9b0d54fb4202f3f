//! Background Tasks Module
//!
//! Periodic maintenance tasks owned by the composition root:
//!
//! - Cache sweep: purges TTL-expired entries from every tier
//! - Session reaper: removes expired sessions
//! - Rate adjuster: retunes the adaptive limiter from response metrics
//!
//! Each spawner returns a JoinHandle; abort it on shutdown so no task
//! outlives its owner.

mod adjust;
mod cleanup;
mod reaper;

pub use adjust::spawn_rate_adjust_task;
pub use cleanup::spawn_cache_sweep_task;
pub use reaper::spawn_session_reaper_task;
