//! Tiered Cache Manager Module
//!
//! Composes several eviction caches under named tiers ("default", "short",
//! "long", "permanent", "multi") behind a single get/set/invalidate façade.
//! Tiers are fixed at construction; an unknown tier name reports a miss
//! rather than creating a tier implicitly.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheStats, LruCache, MultiLayerCache};
use crate::error::{Error, Result};

// == Tier Spec ==
/// Describes one named tier for [`CacheManager::new`].
#[derive(Debug, Clone)]
pub enum TierSpec {
    /// A plain LRU cache with an optional default TTL
    Lru {
        capacity: usize,
        ttl: Option<Duration>,
    },
    /// An L1/L2 multi-layer cache; `disk` enables the L2 layer
    MultiLayer {
        l1_capacity: usize,
        l1_ttl: Option<Duration>,
        disk: Option<(PathBuf, Duration)>,
    },
}

// == Tier Cache ==
/// One tier's backing cache.
#[derive(Debug)]
enum TierCache<V> {
    Lru(LruCache<V>),
    MultiLayer(MultiLayerCache<V>),
}

impl<V> TierCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    fn build(spec: TierSpec) -> Result<Self> {
        match spec {
            TierSpec::Lru { capacity, ttl } => Ok(Self::Lru(LruCache::new(capacity, ttl)?)),
            TierSpec::MultiLayer {
                l1_capacity,
                l1_ttl,
                disk: None,
            } => Ok(Self::MultiLayer(MultiLayerCache::new(l1_capacity, l1_ttl)?)),
            TierSpec::MultiLayer {
                l1_capacity,
                l1_ttl,
                disk: Some((dir, l2_ttl)),
            } => Ok(Self::MultiLayer(MultiLayerCache::with_disk_layer(
                l1_capacity,
                l1_ttl,
                dir,
                l2_ttl,
            )?)),
        }
    }

    fn get(&mut self, key: &str) -> Option<V> {
        match self {
            Self::Lru(cache) => cache.get(key),
            Self::MultiLayer(cache) => cache.get(key),
        }
    }

    fn insert(&mut self, key: String, value: V, ttl: Option<Duration>) {
        match self {
            Self::Lru(cache) => cache.insert(key, value, ttl),
            Self::MultiLayer(cache) => cache.insert(key, value, ttl),
        }
    }

    fn invalidate(&mut self, key: Option<&str>) {
        match (self, key) {
            (Self::Lru(cache), Some(key)) => {
                cache.invalidate(key);
            }
            (Self::Lru(cache), None) => cache.clear(),
            (Self::MultiLayer(cache), key) => cache.invalidate(key),
        }
    }

    fn purge_expired(&mut self) -> usize {
        match self {
            Self::Lru(cache) => cache.purge_expired(),
            Self::MultiLayer(cache) => cache.purge_expired(),
        }
    }

    fn stats(&self) -> CacheStats {
        match self {
            Self::Lru(cache) => cache.stats(),
            Self::MultiLayer(cache) => cache.stats(),
        }
    }
}

// == Cache Manager ==
/// Thread-safe façade over a fixed set of named cache tiers.
///
/// Cloning is cheap and shares the underlying tiers; each tier has its own
/// lock so traffic on one tier does not contend with another.
#[derive(Debug)]
pub struct CacheManager<V> {
    tiers: Arc<HashMap<String, RwLock<TierCache<V>>>>,
}

impl<V> Clone for CacheManager<V> {
    fn clone(&self) -> Self {
        Self {
            tiers: Arc::clone(&self.tiers),
        }
    }
}

impl<V> CacheManager<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Constructor ==
    /// Creates a manager from named tier specs.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` for an empty tier set, a duplicate
    /// tier name, or an invalid tier spec.
    pub fn new(specs: Vec<(impl Into<String>, TierSpec)>) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::InvalidConfig(
                "Cache manager needs at least one tier".to_string(),
            ));
        }

        let mut tiers = HashMap::new();
        for (name, spec) in specs {
            let name = name.into();
            if tiers
                .insert(name.clone(), RwLock::new(TierCache::build(spec)?))
                .is_some()
            {
                return Err(Error::InvalidConfig(format!("Duplicate tier name: {name}")));
            }
        }

        Ok(Self {
            tiers: Arc::new(tiers),
        })
    }

    // == Standard Tiers ==
    /// Creates a manager with the standard tier set:
    ///
    /// | tier        | shape                     |
    /// |-------------|---------------------------|
    /// | `default`   | LRU 200, TTL 10 min       |
    /// | `short`     | LRU 500, TTL 60 s         |
    /// | `long`      | LRU 100, TTL 1 h          |
    /// | `permanent` | LRU 50, no TTL            |
    /// | `multi`     | multi-layer, L1 100 / 5 min, no disk layer |
    pub fn with_standard_tiers() -> Result<Self> {
        Self::new(vec![
            (
                "default",
                TierSpec::Lru {
                    capacity: 200,
                    ttl: Some(Duration::from_secs(600)),
                },
            ),
            (
                "short",
                TierSpec::Lru {
                    capacity: 500,
                    ttl: Some(Duration::from_secs(60)),
                },
            ),
            (
                "long",
                TierSpec::Lru {
                    capacity: 100,
                    ttl: Some(Duration::from_secs(3600)),
                },
            ),
            (
                "permanent",
                TierSpec::Lru {
                    capacity: 50,
                    ttl: None,
                },
            ),
            (
                "multi",
                TierSpec::MultiLayer {
                    l1_capacity: 100,
                    l1_ttl: Some(Duration::from_secs(300)),
                    disk: None,
                },
            ),
        ])
    }

    // == Get ==
    /// Retrieves a value from the named tier.
    ///
    /// An unknown tier reports a miss.
    pub async fn get(&self, key: &str, tier: &str) -> Option<V> {
        let cache = self.tiers.get(tier)?;
        cache.write().await.get(key)
    }

    // == Insert ==
    /// Stores a value in the named tier.
    ///
    /// An unknown tier is a logged no-op.
    pub async fn insert(&self, key: String, value: V, tier: &str, ttl: Option<Duration>) {
        match self.tiers.get(tier) {
            Some(cache) => cache.write().await.insert(key, value, ttl),
            None => debug!(tier, "Ignoring insert into unknown cache tier"),
        }
    }

    // == Invalidate ==
    /// Removes one entry or clears whole caches.
    ///
    /// With `tier` given, only that tier is touched; otherwise the operation
    /// fans out to every tier. With `key` given, only that entry is removed;
    /// otherwise the affected tiers are cleared.
    pub async fn invalidate(&self, key: Option<&str>, tier: Option<&str>) {
        match tier {
            Some(tier) => {
                if let Some(cache) = self.tiers.get(tier) {
                    cache.write().await.invalidate(key);
                }
            }
            None => {
                for cache in self.tiers.values() {
                    cache.write().await.invalidate(key);
                }
            }
        }
    }

    // == Purge Expired ==
    /// Removes TTL-expired entries from every tier.
    ///
    /// Returns the total number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let mut removed = 0;
        for cache in self.tiers.values() {
            removed += cache.write().await.purge_expired();
        }
        removed
    }

    // == Stats ==
    /// Returns per-tier statistics snapshots.
    pub async fn stats(&self) -> HashMap<String, CacheStats> {
        let mut stats = HashMap::new();
        for (name, cache) in self.tiers.iter() {
            stats.insert(name.clone(), cache.read().await.stats());
        }
        stats
    }

    // == Has Tier ==
    /// Checks whether a tier exists.
    pub fn has_tier(&self, tier: &str) -> bool {
        self.tiers.contains_key(tier)
    }
}
