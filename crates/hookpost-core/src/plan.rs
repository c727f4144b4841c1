//! Plan tiers and the policy knobs derived from them
//!
//! The numeric thresholds here are deployment policy, not contract: every
//! value can be overridden when constructing [`PlanPolicy`].

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::HookError;

/// Service tier of a tenant (or of an anonymous guest endpoint)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Guest,
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Guest => "guest",
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    /// Parse the stored/claimed plan string
    pub fn parse(value: &str) -> Result<Plan, HookError> {
        match value {
            "guest" => Ok(Plan::Guest),
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => Err(HookError::BadPlan(other.to_string())),
        }
    }

    /// Paid plans get the large content ceiling and unbounded retention
    pub fn is_paid(&self) -> bool {
        matches!(self, Plan::Pro)
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan-derived policy: size ceilings, retention windows and quotas
#[derive(Debug, Clone)]
pub struct PlanPolicy {
    /// Content ceiling for guest/free captures, in bytes
    pub entry_content_ceiling: usize,
    /// Content ceiling for paid captures, in bytes
    pub paid_content_ceiling: usize,
    /// How long guest/free captures are retained
    pub entry_retention: Duration,
    /// How long a guest/free endpoint itself stays claimable
    pub entry_endpoint_ttl: Duration,
    /// Concurrent live endpoints per free tenant
    pub free_endpoint_limit: u32,
    /// Endpoint name length bounds
    pub name_min: usize,
    pub name_max: usize,
}

impl Default for PlanPolicy {
    fn default() -> Self {
        Self {
            entry_content_ceiling: 10_000,
            paid_content_ceiling: 512_000,
            entry_retention: Duration::hours(6),
            entry_endpoint_ttl: Duration::hours(24),
            free_endpoint_limit: 1,
            name_min: 4,
            name_max: 10,
        }
    }
}

impl PlanPolicy {
    /// Largest body stored verbatim for this plan
    pub fn content_ceiling(&self, plan: Plan) -> usize {
        if plan.is_paid() {
            self.paid_content_ceiling
        } else {
            self.entry_content_ceiling
        }
    }

    /// Retention window for a capture; None means retained indefinitely
    pub fn retention(&self, plan: Plan) -> Option<Duration> {
        if plan.is_paid() {
            None
        } else {
            Some(self.entry_retention)
        }
    }

    /// Lifetime of a newly provisioned endpoint; None means never expires
    pub fn endpoint_ttl(&self, plan: Plan) -> Option<Duration> {
        if plan.is_paid() {
            None
        } else {
            Some(self.entry_endpoint_ttl)
        }
    }

    /// Concurrent-endpoint quota; None means unlimited
    pub fn endpoint_limit(&self, plan: Plan) -> Option<u32> {
        match plan {
            Plan::Pro => None,
            Plan::Free | Plan::Guest => Some(self.free_endpoint_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse_roundtrip() {
        for plan in [Plan::Guest, Plan::Free, Plan::Pro] {
            assert_eq!(Plan::parse(plan.as_str()).unwrap(), plan);
        }

        assert!(matches!(
            Plan::parse("no_brainer"),
            Err(HookError::BadPlan(_))
        ));
    }

    #[test]
    fn test_entry_plans_share_limits() {
        let policy = PlanPolicy::default();

        assert_eq!(policy.content_ceiling(Plan::Guest), 10_000);
        assert_eq!(policy.content_ceiling(Plan::Free), 10_000);
        assert_eq!(policy.content_ceiling(Plan::Pro), 512_000);

        assert_eq!(policy.retention(Plan::Free), Some(Duration::hours(6)));
        assert_eq!(policy.retention(Plan::Pro), None);
    }

    #[test]
    fn test_paid_plan_unlimited_endpoints() {
        let policy = PlanPolicy::default();

        assert_eq!(policy.endpoint_limit(Plan::Free), Some(1));
        assert_eq!(policy.endpoint_limit(Plan::Pro), None);
        assert!(policy.endpoint_ttl(Plan::Pro).is_none());
    }
}
