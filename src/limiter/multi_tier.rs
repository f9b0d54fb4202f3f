//! Multi-Tier Rate Limiter Module
//!
//! Per-identity budgets by subscription plan. Every identity gets two
//! independent sliding windows (per-minute and per-hour) sized from its
//! plan; both must admit a request for it to pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::limiter::{DenyReason, SlidingWindow, Verdict};

// == Plan ==
/// Subscription plan an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Basic,
    Premium,
    Unlimited,
}

// == Plan Limits ==
/// Request budgets for one plan; `None` means unlimited.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanLimits {
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
}

impl Plan {
    /// Default budgets per plan.
    fn default_limits(self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                per_minute: Some(10),
                per_hour: Some(100),
            },
            Self::Basic => PlanLimits {
                per_minute: Some(30),
                per_hour: Some(500),
            },
            Self::Premium => PlanLimits {
                per_minute: Some(100),
                per_hour: Some(2_000),
            },
            Self::Unlimited => PlanLimits {
                per_minute: None,
                per_hour: None,
            },
        }
    }
}

// == Plan Resolver ==
/// Maps an identity to its plan.
///
/// Production deployments back this with their user store; the default
/// [`PrefixPlanResolver`] derives the plan from the identity string.
pub trait PlanResolver: Send + Sync {
    fn plan_for(&self, identity: &str) -> Plan;
}

/// Resolver deriving the plan from identity prefixes: `premium_*` and
/// `basic_*` map to their plans, `admin` is unlimited, everyone else is
/// free.
#[derive(Debug, Default)]
pub struct PrefixPlanResolver;

impl PlanResolver for PrefixPlanResolver {
    fn plan_for(&self, identity: &str) -> Plan {
        if identity == "admin" {
            Plan::Unlimited
        } else if identity.starts_with("premium_") {
            Plan::Premium
        } else if identity.starts_with("basic_") {
            Plan::Basic
        } else {
            Plan::Free
        }
    }
}

// == Quota Status ==
/// Remaining budgets for one identity; `None` means unlimited.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub plan: Plan,
    pub minute_remaining: Option<u32>,
    pub hour_remaining: Option<u32>,
}

// == Identity Windows ==
/// The two budget windows of one identity; `None` = unlimited budget.
#[derive(Debug)]
struct IdentityWindows {
    minute: Option<SlidingWindow>,
    hour: Option<SlidingWindow>,
}

impl IdentityWindows {
    fn for_limits(limits: PlanLimits) -> Self {
        Self {
            minute: limits
                .per_minute
                .map(|n| SlidingWindow::fresh(n as usize, Duration::from_secs(60))),
            hour: limits
                .per_hour
                .map(|n| SlidingWindow::fresh(n as usize, Duration::from_secs(3_600))),
        }
    }
}

// == Inner State ==
struct MultiTierInner {
    limits: HashMap<Plan, PlanLimits>,
    resolver: Box<dyn PlanResolver>,
    identities: HashMap<String, IdentityWindows>,
}

// == Multi-Tier Rate Limiter ==
/// Plan-based per-identity rate limiter.
///
/// Cloning is cheap and shares the limiter state.
#[derive(Clone)]
pub struct MultiTierRateLimiter {
    inner: Arc<Mutex<MultiTierInner>>,
}

impl MultiTierRateLimiter {
    // == Constructor ==
    /// Creates a limiter with the default plan budgets and the prefix
    /// resolver.
    pub fn new() -> Self {
        Self::with_resolver(Box::new(PrefixPlanResolver))
    }

    // == Constructor With Resolver ==
    /// Creates a limiter with the default plan budgets and a custom
    /// identity-to-plan resolver.
    pub fn with_resolver(resolver: Box<dyn PlanResolver>) -> Self {
        let limits = [
            Plan::Free,
            Plan::Basic,
            Plan::Premium,
            Plan::Unlimited,
        ]
        .into_iter()
        .map(|plan| (plan, plan.default_limits()))
        .collect();

        Self {
            inner: Arc::new(Mutex::new(MultiTierInner {
                limits,
                resolver,
                identities: HashMap::new(),
            })),
        }
    }

    // == Check ==
    /// Checks one request for the identity against both of its budget
    /// windows.
    ///
    /// The minute window is consulted first; an admission it grants is
    /// consumed even when the hour window then denies.
    pub async fn check(&self, identity: &str) -> Verdict {
        let mut inner = self.inner.lock().await;

        let plan = inner.resolver.plan_for(identity);
        let limits = inner
            .limits
            .get(&plan)
            .copied()
            .unwrap_or_else(|| plan.default_limits());

        let windows = inner
            .identities
            .entry(identity.to_string())
            .or_insert_with(|| IdentityWindows::for_limits(limits));

        if let Some(minute) = windows.minute.as_mut() {
            let verdict = minute.is_allowed();
            if !verdict.is_allowed() {
                return verdict.labelled(DenyReason::IdentityMinuteBudget);
            }
        }

        if let Some(hour) = windows.hour.as_mut() {
            let verdict = hour.is_allowed();
            if !verdict.is_allowed() {
                return verdict.labelled(DenyReason::IdentityHourBudget);
            }
        }

        Verdict::allow()
    }

    // == Quota ==
    /// Reports the identity's plan and remaining budgets without consuming
    /// an admission.
    pub async fn quota(&self, identity: &str) -> QuotaStatus {
        let mut inner = self.inner.lock().await;

        let plan = inner.resolver.plan_for(identity);
        let limits = inner
            .limits
            .get(&plan)
            .copied()
            .unwrap_or_else(|| plan.default_limits());

        match inner.identities.get_mut(identity) {
            Some(windows) => QuotaStatus {
                plan,
                minute_remaining: windows
                    .minute
                    .as_mut()
                    .map(|w| w.remaining() as u32),
                hour_remaining: windows.hour.as_mut().map(|w| w.remaining() as u32),
            },
            // Identity has not been seen yet: full budgets
            None => QuotaStatus {
                plan,
                minute_remaining: limits.per_minute,
                hour_remaining: limits.per_hour,
            },
        }
    }
}

impl Default for MultiTierRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
