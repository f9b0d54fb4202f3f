//! Memoization Module
//!
//! A higher-order get-or-compute utility bound to one cache tier, replacing
//! recomputation of expensive calls (model inference, LLM prompts, database
//! aggregation) with cache lookups.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::CacheManager;

// == Cache Key ==
/// Stable cache-key builder for memoized calls.
///
/// A key is a scope (typically the function's qualified name) plus its
/// positional and named arguments. Named arguments are kept sorted by name,
/// so two call sites passing the same arguments in different order produce
/// the same key. Callers may render any string themselves instead; a custom
/// key that is sensitive to argument order only degrades the hit rate, it
/// cannot return a wrong value.
#[derive(Debug, Clone)]
pub struct CacheKey {
    scope: String,
    args: Vec<String>,
    named: BTreeMap<String, String>,
}

impl CacheKey {
    // == Constructor ==
    /// Starts a key for the given scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            args: Vec::new(),
            named: BTreeMap::new(),
        }
    }

    // == Positional Argument ==
    /// Appends a positional argument.
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.args.push(value.to_string());
        self
    }

    // == Named Argument ==
    /// Adds a named argument; insertion order does not matter.
    pub fn named(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.named.insert(name.into(), value.to_string());
        self
    }

    // == Render ==
    /// Renders the final key string.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(1 + self.args.len() + self.named.len());
        parts.push(self.scope.clone());
        parts.extend(self.args.iter().cloned());
        parts.extend(self.named.iter().map(|(k, v)| format!("{k}={v}")));
        parts.join(":")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// == Memoized ==
/// Memoizes compute functions through one tier of a [`CacheManager`].
///
/// Cloning shares the underlying manager.
#[derive(Debug, Clone)]
pub struct Memoized<V> {
    manager: CacheManager<V>,
    tier: String,
    ttl: Option<Duration>,
}

impl<V> Memoized<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Constructor ==
    /// Binds a memoizer to a tier of the given manager.
    pub fn new(manager: CacheManager<V>, tier: impl Into<String>) -> Self {
        Self {
            manager,
            tier: tier.into(),
            ttl: None,
        }
    }

    // == TTL Override ==
    /// Sets a per-entry TTL overriding the tier default.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    // == Call ==
    /// Resolves the key from cache, or runs `compute` and stores its result.
    ///
    /// Equal keys within the TTL resolve without recomputation.
    pub async fn call<F, Fut>(&self, key: &CacheKey, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let rendered = key.render();

        if let Some(hit) = self.manager.get(&rendered, &self.tier).await {
            debug!(key = %rendered, tier = %self.tier, "Memoized call served from cache");
            return hit;
        }

        let value = compute().await;
        self.manager
            .insert(rendered, value.clone(), &self.tier, self.ttl)
            .await;
        value
    }

    // == Invalidate ==
    /// Clears every memoized result in this memoizer's tier.
    pub async fn invalidate_all(&self) {
        self.manager.invalidate(None, Some(&self.tier)).await;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn memoized() -> Memoized<String> {
        Memoized::new(CacheManager::with_standard_tiers().unwrap(), "default")
    }

    #[test]
    fn test_key_named_args_are_order_independent() {
        let a = CacheKey::new("recipes::search")
            .arg("kimchi")
            .named("cuisine", "korean")
            .named("limit", 10);
        let b = CacheKey::new("recipes::search")
            .arg("kimchi")
            .named("limit", 10)
            .named("cuisine", "korean");

        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn test_key_positional_args_keep_order() {
        let a = CacheKey::new("scope").arg(1).arg(2);
        let b = CacheKey::new("scope").arg(2).arg(1);

        assert_ne!(a.render(), b.render());
    }

    #[test]
    fn test_key_render_shape() {
        let key = CacheKey::new("m::f").arg("x").named("b", 2).named("a", 1);
        assert_eq!(key.render(), "m::f:x:a=1:b=2");
    }

    #[tokio::test]
    async fn test_second_call_does_not_recompute() {
        let memo = memoized();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("expensive").arg(7);

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let result = memo
                .call(&key, || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "computed".to_string()
                })
                .await;
            assert_eq!(result, "computed");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_recompute() {
        let memo = memoized();
        let calls = Arc::new(AtomicUsize::new(0));

        for i in 0..2 {
            let calls = Arc::clone(&calls);
            memo.call(&CacheKey::new("f").arg(i), || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                "v".to_string()
            })
            .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_recompute() {
        let memo = memoized();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("f");

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            memo.call(&key, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                "v".to_string()
            })
            .await;
            memo.invalidate_all().await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ttl_override_expires_entry() {
        let memo = memoized().with_ttl(Duration::from_millis(40));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::new("f");

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            memo.call(&key, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                "v".to_string()
            })
            .await;
            tokio::time::sleep(Duration::from_millis(80)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
