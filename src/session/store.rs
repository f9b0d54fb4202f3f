//! Session Store Module
//!
//! Thread-safe map from opaque tokens to session records, bounded by LRU
//! eviction and session TTL. Expired sessions behave exactly like absent
//! ones on read; the background reaper only keeps storage from growing
//! between reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::LruTracker;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::session::SessionRecord;

/// Token length in characters; 43 alphanumerics carry ~256 bits of entropy.
const TOKEN_LENGTH: usize = 43;

// == Inner State ==
#[derive(Debug)]
struct SessionInner<P> {
    /// Token-to-record storage
    sessions: HashMap<String, SessionRecord<P>>,
    /// Recency order for capacity eviction
    lru: LruTracker,
}

// == Session Store ==
/// Time-bounded LRU session store.
///
/// Cloning is cheap and shares the store; all mutation is serialized behind
/// one lock shared with the reaper task.
#[derive(Debug)]
pub struct SessionStore<P> {
    inner: Arc<RwLock<SessionInner<P>>>,
    max_sessions: usize,
    ttl: Duration,
}

impl<P> Clone for SessionStore<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            max_sessions: self.max_sessions,
            ttl: self.ttl,
        }
    }
}

impl<P: Clone> SessionStore<P> {
    // == Constructor ==
    /// Creates a store holding at most `max_sessions` sessions that each
    /// live for `ttl` past their last access.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` for a zero capacity or zero TTL.
    pub fn new(max_sessions: usize, ttl: Duration) -> Result<Self> {
        if max_sessions == 0 {
            return Err(Error::InvalidConfig(
                "Session capacity must be > 0".to_string(),
            ));
        }
        if ttl.is_zero() {
            return Err(Error::InvalidConfig("Session TTL must be > 0".to_string()));
        }

        Ok(Self {
            inner: Arc::new(RwLock::new(SessionInner {
                sessions: HashMap::new(),
                lru: LruTracker::new(),
            })),
            max_sessions,
            ttl,
        })
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        Self::new(config.max_sessions, config.session_ttl)
    }

    // == Create ==
    /// Creates a session for the identity and returns its fresh token.
    ///
    /// At capacity the globally least-recently-used session is evicted
    /// first, so the store can never grow without bound.
    pub async fn create(&self, identity: impl Into<String>, payload: P) -> String {
        let token = generate_token();
        let record = SessionRecord::new(identity.into(), payload, self.ttl);

        let mut inner = self.inner.write().await;

        if inner.sessions.len() >= self.max_sessions {
            if let Some(evicted) = inner.lru.pop_lru() {
                inner.sessions.remove(&evicted);
                debug!("Evicted least-recently-used session at capacity");
            }
        }

        inner.sessions.insert(token.clone(), record);
        inner.lru.touch(&token);

        token
    }

    // == Get ==
    /// Returns the session payload when the token is active.
    ///
    /// A hit refreshes the record's recency and TTL clock. An expired
    /// record is removed on sight and reported exactly like an absent one.
    pub async fn get(&self, token: &str) -> Option<P> {
        let mut inner = self.inner.write().await;

        let expired = match inner.sessions.get_mut(token) {
            None => return None,
            Some(record) if record.is_expired() => true,
            Some(record) => {
                record.refresh(self.ttl);
                false
            }
        };

        if expired {
            inner.sessions.remove(token);
            inner.lru.forget(token);
            return None;
        }

        inner.lru.touch(token);
        inner
            .sessions
            .get(token)
            .map(|record| record.payload.clone())
    }

    // == Delete ==
    /// Explicit logout. Idempotent: returns false when the token was
    /// already absent.
    pub async fn delete(&self, token: &str) -> bool {
        let mut inner = self.inner.write().await;

        if inner.sessions.remove(token).is_some() {
            inner.lru.forget(token);
            true
        } else {
            false
        }
    }

    // == Extend ==
    /// Pushes an active session's expiry out by `extra`.
    ///
    /// Returns false when the token is absent or already expired.
    pub async fn extend(&self, token: &str, extra: Duration) -> bool {
        let mut inner = self.inner.write().await;

        let extended = match inner.sessions.get_mut(token) {
            Some(record) if !record.is_expired() => {
                record.extend(extra);
                true
            }
            _ => false,
        };

        if extended {
            inner.lru.touch(token);
        }
        extended
    }

    // == Active Count ==
    /// Number of stored sessions, including expired ones the reaper has not
    /// visited yet.
    pub async fn active_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    // == Reap Expired ==
    /// Removes every expired session.
    ///
    /// Called by the background reaper; reads self-check expiry, so this
    /// only bounds storage growth. Returns the number removed.
    pub async fn reap_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired_tokens: Vec<String> = inner
            .sessions
            .iter()
            .filter(|(_, record)| record.is_expired())
            .map(|(token, _)| token.clone())
            .collect();

        let count = expired_tokens.len();

        for token in expired_tokens {
            inner.sessions.remove(&token);
            inner.lru.forget(&token);
        }

        if count > 0 {
            info!(count, "Reaped expired sessions");
        }
        count
    }
}

// == Token Generation ==
/// Generates an unguessable URL-safe session token.
fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
