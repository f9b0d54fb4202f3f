//! Session Record Module
//!
//! Defines the per-token session state held by the session store.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

// == Session Record ==
/// One authenticated session.
///
/// A record moves through `Active -> Expired -> Removed`; expiry is decided
/// by comparing `expires_at` against the current time, so a record can be
/// observably expired before any sweep physically removes it.
#[derive(Debug, Clone)]
pub struct SessionRecord<P> {
    /// The identity that owns this session
    pub identity: String,
    /// Opaque session payload
    pub payload: P,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last successfully read
    pub last_accessed: DateTime<Utc>,
    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl<P> SessionRecord<P> {
    // == Constructor ==
    /// Creates an active record expiring `ttl` from now.
    pub fn new(identity: String, payload: P, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            identity,
            payload,
            created_at: now,
            last_accessed: now,
            expires_at: expiry_after(now, ttl),
        }
    }

    // == Is Expired ==
    /// A record is expired the instant `now > expires_at`.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    // == Refresh ==
    /// Marks the record as just accessed and restarts its TTL clock.
    pub fn refresh(&mut self, ttl: Duration) {
        let now = Utc::now();
        self.last_accessed = now;
        self.expires_at = expiry_after(now, ttl);
    }

    // == Extend ==
    /// Pushes the expiry out by `extra` without touching `last_accessed`.
    pub fn extend(&mut self, extra: Duration) {
        self.expires_at = expiry_after(self.expires_at, extra);
    }
}

/// Adds a std duration to a timestamp, saturating instead of overflowing.
fn expiry_after(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(duration)
        .ok()
        .and_then(|delta| start.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
