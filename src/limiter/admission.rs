//! Admission Control Module
//!
//! The top-level "is this request allowed" decision. Chains the identity's
//! plan budgets, the endpoint/peer limits, and the global adaptive limiter,
//! short-circuiting on the first denial so its reason and wait hint reach
//! the caller unchanged.

use std::time::Duration;

use crate::limiter::{
    AdaptiveRateLimiter, EndpointRateLimiter, MultiTierRateLimiter, QuotaStatus, Verdict,
};

// == Admission Control ==
/// Chained admission check over the three rate-limiting scopes.
///
/// Each component locks only itself, one at a time; no lock is held across
/// the chain.
#[derive(Clone)]
pub struct AdmissionControl {
    identities: MultiTierRateLimiter,
    endpoints: EndpointRateLimiter,
    adaptive: AdaptiveRateLimiter,
}

impl AdmissionControl {
    // == Constructor ==
    /// Composes an admission chain from the three limiters.
    pub fn new(
        identities: MultiTierRateLimiter,
        endpoints: EndpointRateLimiter,
        adaptive: AdaptiveRateLimiter,
    ) -> Self {
        Self {
            identities,
            endpoints,
            adaptive,
        }
    }

    // == Check ==
    /// Runs the full admission chain for one request.
    ///
    /// Order: identity plan budgets, then endpoint/peer limits, then the
    /// global adaptive limiter. The first denial wins.
    pub async fn check(&self, identity: &str, endpoint: &str, peer: &str) -> Verdict {
        let verdict = self.identities.check(identity).await;
        if !verdict.is_allowed() {
            return verdict;
        }

        let verdict = self.endpoints.check(endpoint, peer).await;
        if !verdict.is_allowed() {
            return verdict;
        }

        self.adaptive.is_allowed().await
    }

    // == Record Response ==
    /// Feeds a downstream outcome into the adaptive limiter.
    pub async fn record_response(&self, latency: Duration, success: bool) {
        self.adaptive.record_response(latency, success).await;
    }

    // == Quota ==
    /// Reports the identity's remaining plan budgets.
    pub async fn quota(&self, identity: &str) -> QuotaStatus {
        self.identities.quota(identity).await
    }

    /// The adaptive limiter, for wiring up the background adjuster task.
    pub fn adaptive(&self) -> &AdaptiveRateLimiter {
        &self.adaptive
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{AdaptiveConfig, DenyReason};

    fn admission(adaptive_limit: usize) -> AdmissionControl {
        AdmissionControl::new(
            MultiTierRateLimiter::new(),
            EndpointRateLimiter::with_standard_endpoints().unwrap(),
            AdaptiveRateLimiter::new(AdaptiveConfig::new(adaptive_limit)).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_when_all_budgets_allow() {
        let admission = admission(100);

        let verdict = admission
            .check("premium_alice", "/api/search", "10.0.0.1")
            .await;
        assert!(verdict.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_budget_denies_first() {
        let admission = admission(1_000);

        // Free plan allows 10 per minute
        for _ in 0..10 {
            assert!(admission
                .check("carol", "/api/search", "10.0.0.1")
                .await
                .is_allowed());
        }

        let verdict = admission.check("carol", "/api/search", "10.0.0.1").await;
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.denied_by, Some(DenyReason::IdentityMinuteBudget));
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoint_budget_denied_before_adaptive() {
        let admission = admission(1_000);

        // Upload bucket holds 5 tokens
        for _ in 0..5 {
            admission
                .check("premium_alice", "/api/upload", "10.0.0.1")
                .await;
        }

        let verdict = admission
            .check("premium_alice", "/api/upload", "10.0.0.1")
            .await;
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.denied_by, Some(DenyReason::EndpointBudget));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_denies_last() {
        let admission = admission(3);

        for _ in 0..3 {
            assert!(admission
                .check("premium_alice", "/api/search", "10.0.0.1")
                .await
                .is_allowed());
        }

        let verdict = admission
            .check("premium_alice", "/api/search", "10.0.0.1")
            .await;
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.denied_by, Some(DenyReason::SystemThrottle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_request_does_not_consume_later_budgets() {
        let admission = admission(1_000);

        // Ten admitted requests drain carol's free-plan minute budget; the
        // hundred that follow are denied at the identity stage.
        for _ in 0..110 {
            admission.check("carol", "/api/search", "10.0.0.1").await;
        }

        // The denials did not count against the shared peer window
        // (100/min): another identity on the same peer is still admitted.
        let verdict = admission
            .check("premium_alice", "/api/search", "10.0.0.1")
            .await;
        assert!(verdict.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_passthrough() {
        let admission = admission(100);

        admission.check("carol", "/api/search", "10.0.0.1").await;

        let quota = admission.quota("carol").await;
        assert_eq!(quota.minute_remaining, Some(9));
    }
}
