//! Cache Module
//!
//! In-memory caching with TTL expiration and LRU eviction: the single-tier
//! eviction cache, the L1/L2 multi-layer variant, the named-tier manager
//! façade, and the memoization utility built on top of it.

mod entry;
mod lru;
mod memo;
mod multi_layer;
mod stats;
mod store;
mod tiered;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memo::{CacheKey, Memoized};
pub use multi_layer::MultiLayerCache;
pub use stats::CacheStats;
pub use store::LruCache;
pub use tiered::{CacheManager, TierSpec};
