//! Multi-Layer Cache Module
//!
//! Two-level cache: a fast in-memory L1 backed by an optional on-disk L2.
//! Reads check L1 first and promote L2 hits; writes go through to both
//! layers. L2 entries expire by file modification time and are serialized
//! with serde_json, named by the SHA-256 of their key.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{CacheStats, LruCache};
use crate::error::{Error, Result};

// == Disk Layer ==
/// The on-disk L2 layer: a directory of serialized entries.
#[derive(Debug)]
struct DiskLayer {
    /// Directory holding one file per cached key
    dir: PathBuf,
    /// Entries older than this (by file mtime) are stale
    ttl: Duration,
}

impl DiskLayer {
    /// Maps a cache key to its backing file path.
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{digest}.cache"))
    }

    /// Whether a file's modification time is within the layer TTL.
    fn is_fresh(&self, path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }
}

// == Multi-Layer Cache ==
/// L1 memory cache with an optional slower L2 disk layer.
///
/// L2 file I/O runs while the owning tier lock is held; keep the cache
/// directory on fast local disk.
#[derive(Debug)]
pub struct MultiLayerCache<V> {
    /// In-memory L1
    l1: LruCache<V>,
    /// On-disk L2, if enabled
    l2: Option<DiskLayer>,
}

impl<V> MultiLayerCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Constructor ==
    /// Creates a memory-only multi-layer cache (L2 disabled).
    pub fn new(l1_capacity: usize, l1_ttl: Option<Duration>) -> Result<Self> {
        Ok(Self {
            l1: LruCache::new(l1_capacity, l1_ttl)?,
            l2: None,
        })
    }

    // == Constructor With Disk Layer ==
    /// Creates a multi-layer cache with an on-disk L2.
    ///
    /// # Arguments
    /// * `l1_capacity` - L1 entry limit
    /// * `l1_ttl` - L1 default TTL
    /// * `dir` - Directory for L2 entry files (created if missing)
    /// * `l2_ttl` - Age after which L2 files are considered stale
    pub fn with_disk_layer(
        l1_capacity: usize,
        l1_ttl: Option<Duration>,
        dir: impl Into<PathBuf>,
        l2_ttl: Duration,
    ) -> Result<Self> {
        if l2_ttl.is_zero() {
            return Err(Error::InvalidConfig("L2 TTL must be > 0".to_string()));
        }

        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::InvalidConfig(format!("Cannot create cache directory {dir:?}: {e}"))
        })?;

        Ok(Self {
            l1: LruCache::new(l1_capacity, l1_ttl)?,
            l2: Some(DiskLayer { dir, ttl: l2_ttl }),
        })
    }

    // == Get ==
    /// Retrieves a value, checking L1 then L2.
    ///
    /// A fresh L2 hit is promoted into L1 so subsequent reads stay in
    /// memory. A stale L2 file is removed on sight. L2 read failures are
    /// logged and degrade to a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        if let Some(value) = self.l1.get(key) {
            return Some(value);
        }

        let layer = self.l2.as_ref()?;
        let path = layer.entry_path(key);

        if !path.exists() {
            return None;
        }

        if !layer.is_fresh(&path) {
            let _ = fs::remove_file(&path);
            return None;
        }

        match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<V>(&raw) {
                Ok(value) => {
                    // Promote to L1
                    self.l1.insert(key.to_string(), value.clone(), None);
                    debug!(key, "Promoted L2 entry to L1");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "L2 cache entry is corrupt, removing");
                    let _ = fs::remove_file(&path);
                    None
                }
            },
            Err(e) => {
                warn!(key, error = %e, "L2 cache read error");
                None
            }
        }
    }

    // == Insert ==
    /// Stores a value in L1 and writes it through to L2.
    ///
    /// L2 write failures are logged; the L1 insert still stands.
    pub fn insert(&mut self, key: String, value: V, ttl: Option<Duration>) {
        if let Some(layer) = &self.l2 {
            let path = layer.entry_path(&key);
            match serde_json::to_string(&value) {
                Ok(raw) => {
                    if let Err(e) = fs::write(&path, raw) {
                        warn!(key = %key, error = %e, "L2 cache write error");
                    }
                }
                Err(e) => warn!(key = %key, error = %e, "L2 cache serialization error"),
            }
        }

        self.l1.insert(key, value, ttl);
    }

    // == Invalidate ==
    /// Removes one entry from both layers, or clears both when no key is
    /// given.
    pub fn invalidate(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.l1.invalidate(key);
                if let Some(layer) = &self.l2 {
                    let _ = fs::remove_file(layer.entry_path(key));
                }
            }
            None => {
                self.l1.clear();
                if let Some(layer) = &self.l2 {
                    remove_entry_files(&layer.dir, |_| true);
                }
            }
        }
    }

    // == Purge Expired ==
    /// Removes TTL-expired L1 entries and stale L2 files.
    ///
    /// Returns the number of entries removed across both layers.
    pub fn purge_expired(&mut self) -> usize {
        let mut removed = self.l1.purge_expired();

        if let Some(layer) = &self.l2 {
            removed += remove_entry_files(&layer.dir, |path| !layer.is_fresh(path));
        }

        removed
    }

    // == Stats ==
    /// Returns L1 statistics (the L2 layer keeps no counters).
    pub fn stats(&self) -> CacheStats {
        self.l1.stats()
    }
}

/// Removes `.cache` files under `dir` matching the predicate; returns the
/// number removed.
fn remove_entry_files(dir: &Path, should_remove: impl Fn(&Path) -> bool) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_cache_file = path.extension().is_some_and(|ext| ext == "cache");
        if is_cache_file && should_remove(&path) && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}
