//! Endpoint Rate Limiter Module
//!
//! Guards named endpoints with token buckets (bursty operations get small
//! buckets with slow refill) and every calling peer with its own sliding
//! window. An endpoint without a configured bucket passes the endpoint
//! check; the peer window always applies.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::limiter::{DenyReason, SlidingWindow, TokenBucket, Verdict};

/// Per-peer window defaults: 100 requests per minute.
const PEER_LIMIT: usize = 100;
const PEER_WINDOW: Duration = Duration::from_secs(60);

// == Inner State ==
struct EndpointInner {
    /// Token buckets for configured endpoints
    endpoints: HashMap<String, TokenBucket>,
    /// Lazily created per-peer windows
    peers: HashMap<String, SlidingWindow>,
}

// == Endpoint Rate Limiter ==
/// Per-endpoint and per-peer admission control.
///
/// Cloning is cheap and shares the limiter state.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    inner: Arc<Mutex<EndpointInner>>,
}

impl EndpointRateLimiter {
    // == Constructor ==
    /// Creates a limiter with no endpoint buckets configured.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EndpointInner {
                endpoints: HashMap::new(),
                peers: HashMap::new(),
            })),
        }
    }

    // == Standard Endpoints ==
    /// Creates a limiter with buckets for the standard inference endpoints:
    ///
    /// | endpoint         | capacity | refill/s |
    /// |------------------|----------|----------|
    /// | `/api/recognize` | 20       | 1.0      |
    /// | `/api/generate`  | 10       | 0.5      |
    /// | `/api/search`    | 50       | 5.0      |
    /// | `/api/upload`    | 5        | 0.2      |
    pub fn with_standard_endpoints() -> Result<Self> {
        let mut endpoints = HashMap::new();
        endpoints.insert("/api/recognize".to_string(), TokenBucket::new(20, 1.0)?);
        endpoints.insert("/api/generate".to_string(), TokenBucket::new(10, 0.5)?);
        endpoints.insert("/api/search".to_string(), TokenBucket::new(50, 5.0)?);
        endpoints.insert("/api/upload".to_string(), TokenBucket::new(5, 0.2)?);

        Ok(Self {
            inner: Arc::new(Mutex::new(EndpointInner {
                endpoints,
                peers: HashMap::new(),
            })),
        })
    }

    // == Set Endpoint Limit ==
    /// Configures (or replaces) the bucket guarding one endpoint.
    pub async fn set_endpoint_limit(
        &self,
        endpoint: impl Into<String>,
        capacity: u32,
        refill_rate: f64,
    ) -> Result<()> {
        let bucket = TokenBucket::new(capacity, refill_rate)?;
        self.inner
            .lock()
            .await
            .endpoints
            .insert(endpoint.into(), bucket);
        Ok(())
    }

    // == Check ==
    /// Checks one request from `peer` against the peer window, then against
    /// the endpoint's bucket if one is configured.
    pub async fn check(&self, endpoint: &str, peer: &str) -> Verdict {
        let mut inner = self.inner.lock().await;

        let peer_window = inner
            .peers
            .entry(peer.to_string())
            .or_insert_with(|| SlidingWindow::fresh(PEER_LIMIT, PEER_WINDOW));
        let verdict = peer_window.is_allowed();
        if !verdict.is_allowed() {
            return verdict.labelled(DenyReason::PeerBudget);
        }

        if let Some(bucket) = inner.endpoints.get_mut(endpoint) {
            let verdict = bucket.consume(1);
            if !verdict.is_allowed() {
                return verdict.labelled(DenyReason::EndpointBudget);
            }
        }

        Verdict::allow()
    }
}

impl Default for EndpointRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
