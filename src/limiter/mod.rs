//! Rate Limiter Module
//!
//! Admission control for request handling. Four interchangeable algorithms
//! answer "is this request allowed right now, and if not, how long to wait":
//!
//! - [`TokenBucket`] - continuous refill, allows short bursts
//! - [`SlidingWindow`] - exact counting over a trailing interval
//! - [`AdaptiveRateLimiter`] - sliding window retuned from response feedback
//! - [`MultiTierRateLimiter`] - per-identity minute/hour budgets by plan
//!
//! [`EndpointRateLimiter`] guards named endpoints and peers, and
//! [`AdmissionControl`] chains the identity, endpoint, and adaptive checks
//! into one decision. Limiters never error; every check returns a
//! [`Verdict`].

mod adaptive;
mod admission;
mod endpoint;
mod multi_tier;
mod sliding_window;
mod token_bucket;

use std::fmt;
use std::time::Duration;

// Re-export public types
pub use adaptive::{AdaptiveConfig, AdaptiveRateLimiter};
pub use admission::AdmissionControl;
pub use endpoint::EndpointRateLimiter;
pub use multi_tier::{
    MultiTierRateLimiter, Plan, PlanLimits, PlanResolver, PrefixPlanResolver, QuotaStatus,
};
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

// == Verdict ==
/// Outcome of a rate-limit check.
///
/// An allowed verdict always carries a zero `retry_after`. Callers are
/// responsible for surfacing the wait hint to the requester; nothing is
/// retried automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Whether the request may proceed
    pub allowed: bool,
    /// How long to wait before the request would be admitted
    pub retry_after: Duration,
    /// Which budget denied the request, when one did
    pub denied_by: Option<DenyReason>,
}

impl Verdict {
    // == Allow ==
    /// An admitted request.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
            denied_by: None,
        }
    }

    // == Deny ==
    /// A denied request with a wait hint.
    pub fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
            denied_by: None,
        }
    }

    /// Returns true when the request may proceed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Attaches the denying budget to a deny verdict; no-op when allowed.
    pub(crate) fn labelled(mut self, reason: DenyReason) -> Self {
        if !self.allowed {
            self.denied_by = Some(reason);
        }
        self
    }
}

// == Deny Reason ==
/// Which budget rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The identity's per-minute plan budget is spent
    IdentityMinuteBudget,
    /// The identity's per-hour plan budget is spent
    IdentityHourBudget,
    /// The calling peer exceeded its request window
    PeerBudget,
    /// The endpoint's token bucket ran dry
    EndpointBudget,
    /// The global adaptive limiter is throttling
    SystemThrottle,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IdentityMinuteBudget => "per-minute limit reached",
            Self::IdentityHourBudget => "hourly limit reached",
            Self::PeerBudget => "peer rate limit exceeded",
            Self::EndpointBudget => "endpoint rate limit exceeded",
            Self::SystemThrottle => "system rate limit",
        };
        f.write_str(text)
    }
}
