//! Eviction Cache Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL
//! expiration. Absence is a first-class result: `get` returns `Option`, and
//! every operation is total.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::error::{Error, Result};

// == Eviction Cache ==
/// Fixed-capacity key/value store with LRU eviction and optional TTL.
#[derive(Debug)]
pub struct LruCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Default TTL for entries without an explicit one; None = never expires
    default_ttl: Option<Duration>,
}

impl<V: Clone> LruCache<V> {
    // == Constructor ==
    /// Creates a new cache with the given capacity and default TTL.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL applied to entries inserted without one;
    ///   `None` disables time-based expiry for such entries
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` when `capacity` is zero.
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "Cache capacity must be > 0".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(capacity),
            capacity,
            default_ttl,
        })
    }

    // == Get ==
    /// Retrieves a value by key, marking it most recently used.
    ///
    /// An entry whose TTL has elapsed is purged on sight and reported as a
    /// miss, so expiry is observable even if the background sweep never runs.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.lru.forget(key);
                self.stats.set_size(self.entries.len());
                self.stats.record_miss();
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Insert ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// Overwriting an existing key refreshes its recency and restarts its TTL
    /// clock. Inserting a new key at capacity evicts the least recently used
    /// entry first.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (falls back to the cache default when None)
    pub fn insert(&mut self, key: String, value: V, ttl: Option<Duration>) {
        let is_overwrite = self.entries.contains_key(&key);

        // If not overwriting and at capacity, evict the LRU entry
        if !is_overwrite && self.entries.len() >= self.capacity {
            if let Some(evicted_key) = self.lru.pop_lru() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
                debug!(key = %evicted_key, "Evicted LRU entry");
            }
        }

        let effective_ttl = ttl.or(self.default_ttl);
        let entry = CacheEntry::new(value, effective_ttl);
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_size(self.entries.len());
    }

    // == Invalidate ==
    /// Removes an entry by key.
    ///
    /// Returns false if the key was not present.
    pub fn invalidate(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.forget(key);
            self.stats.set_size(self.entries.len());
            true
        } else {
            false
        }
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_size(0);
    }

    // == Purge Expired ==
    /// Removes all TTL-expired entries.
    ///
    /// Called by the background sweep; `get` self-checks expiry, so this is
    /// an efficiency measure, not a correctness requirement.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
            self.lru.forget(&key);
        }

        self.stats.set_size(self.entries.len());
        count
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn cache() -> LruCache<String> {
        LruCache::new(100, Some(Duration::from_secs(300))).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        let result = LruCache::<String>::new(0, None);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = cache();

        store.insert("key1".to_string(), "value1".to_string(), None);

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut store = cache();

        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_invalidate() {
        let mut store = cache();

        store.insert("key1".to_string(), "value1".to_string(), None);

        assert!(store.invalidate("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_invalidate_nonexistent() {
        let mut store = cache();

        assert!(!store.invalidate("nonexistent"));
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let mut store = cache();

        store.insert("key1".to_string(), "value1".to_string(), None);
        store.insert("key1".to_string(), "value2".to_string(), None);

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_ttl_expiration() {
        let mut store = cache();

        store.insert(
            "key1".to_string(),
            "value1".to_string(),
            Some(Duration::from_millis(100)),
        );

        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(150));

        assert_eq!(store.get("key1"), None);
        // Lazy expiry also removed the entry
        assert!(store.is_empty());
    }

    #[test]
    fn test_no_default_ttl_never_expires() {
        let mut store: LruCache<String> = LruCache::new(10, None).unwrap();

        store.insert("key1".to_string(), "value1".to_string(), None);

        sleep(Duration::from_millis(50));

        assert!(store.get("key1").is_some());
    }

    #[test]
    fn test_lru_eviction_on_capacity() {
        let mut store: LruCache<String> = LruCache::new(3, None).unwrap();

        store.insert("key1".to_string(), "value1".to_string(), None);
        store.insert("key2".to_string(), "value2".to_string(), None);
        store.insert("key3".to_string(), "value3".to_string(), None);

        // Cache is full, adding key4 evicts key1 (oldest)
        store.insert("key4".to_string(), "value4".to_string(), None);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut store: LruCache<String> = LruCache::new(3, None).unwrap();

        store.insert("key1".to_string(), "value1".to_string(), None);
        store.insert("key2".to_string(), "value2".to_string(), None);
        store.insert("key3".to_string(), "value3".to_string(), None);

        // Access key1 so key2 becomes the eviction candidate
        store.get("key1");

        store.insert("key4".to_string(), "value4".to_string(), None);

        assert!(store.get("key1").is_some());
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_overwrite_refreshes_recency() {
        let mut store: LruCache<String> = LruCache::new(3, None).unwrap();

        store.insert("key1".to_string(), "a".to_string(), None);
        store.insert("key2".to_string(), "b".to_string(), None);
        store.insert("key3".to_string(), "c".to_string(), None);

        // Overwriting key1 moves it to the most-recent slot
        store.insert("key1".to_string(), "a2".to_string(), None);

        store.insert("key4".to_string(), "d".to_string(), None);

        assert_eq!(store.get("key1"), Some("a2".to_string()));
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_stats_counters() {
        let mut store = cache();

        store.insert("key1".to_string(), "value1".to_string(), None);
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 100);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_purge_expired() {
        let mut store = cache();

        store.insert(
            "short".to_string(),
            "v".to_string(),
            Some(Duration::from_millis(100)),
        );
        store.insert(
            "long".to_string(),
            "v".to_string(),
            Some(Duration::from_secs(10)),
        );

        sleep(Duration::from_millis(150));

        let removed = store.purge_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").is_some());
    }

    #[test]
    fn test_clear() {
        let mut store = cache();

        store.insert("key1".to_string(), "value1".to_string(), None);
        store.insert("key2".to_string(), "value2".to_string(), None);
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }
}
