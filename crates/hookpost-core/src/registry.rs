//! Endpoint registry: name → tenant/plan/expiry mapping
//!
//! Owns resolution, availability checks and provisioning. Uniqueness under
//! concurrent provisioning is enforced by the store's unique index, not by
//! an in-process lock: a losing racer gets `Conflict`, never a silent
//! overwrite.

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::HookError;
use crate::plan::{Plan, PlanPolicy};
use crate::reserved;
use hookpost_db::entities::endpoint;
use hookpost_db::store;

/// Verified identity of a provisioning caller, supplied by the auth boundary
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: String,
    pub email: String,
    pub plan: Plan,
}

/// Outcome of an availability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Taken,
    Reserved,
    /// Claimable with a mail address issued by that organisation
    ReservedOrg,
    Invalid,
}

/// Registry over the endpoints table
pub struct EndpointRegistry {
    db: DatabaseConnection,
    policy: PlanPolicy,
}

impl EndpointRegistry {
    pub fn new(db: DatabaseConnection, policy: PlanPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &PlanPolicy {
        &self.policy
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Lowercase and validate an endpoint name
    fn normalize_name(&self, name: &str) -> Result<String, HookError> {
        let name = name.to_lowercase();
        let bounds_ok = name.len() >= self.policy.name_min && name.len() <= self.policy.name_max;
        let charset_ok = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

        if bounds_ok && charset_ok {
            Ok(name)
        } else {
            Err(HookError::InvalidName {
                min: self.policy.name_min,
                max: self.policy.name_max,
            })
        }
    }

    /// Case-insensitive lookup excluding soft-deleted and expired rows.
    /// Hook ingestion and inspector admission go through here.
    pub async fn resolve(&self, name: &str) -> Result<endpoint::Model, HookError> {
        let name = name.to_lowercase();
        store::find_live_endpoint(&self.db, &name, Utc::now())
            .await?
            .ok_or(HookError::NotFound(name))
    }

    /// Lookup that also returns expired (but not deleted) endpoints, for
    /// historical stats
    pub async fn resolve_any(&self, name: &str) -> Result<endpoint::Model, HookError> {
        let name = name.to_lowercase();
        store::find_endpoint(&self.db, &name)
            .await?
            .ok_or(HookError::NotFound(name))
    }

    /// Availability of a name for provisioning
    pub async fn check_availability(&self, name: &str) -> Result<Availability, HookError> {
        let name = match self.normalize_name(name) {
            Ok(name) => name,
            Err(_) => return Ok(Availability::Invalid),
        };

        if reserved::is_reserved(&name) {
            return Ok(Availability::Reserved);
        }
        if reserved::is_reserved_org(&name) {
            return Ok(Availability::ReservedOrg);
        }

        let taken = store::find_live_endpoint(&self.db, &name, Utc::now())
            .await?
            .is_some();

        Ok(if taken {
            Availability::Taken
        } else {
            Availability::Available
        })
    }

    /// Claim a name for a tenant
    pub async fn provision(
        &self,
        name: &str,
        ctx: &TenantContext,
    ) -> Result<endpoint::Model, HookError> {
        let name = self.normalize_name(name)?;

        if reserved::is_reserved(&name) {
            return Err(HookError::Reserved(name));
        }
        if reserved::is_reserved_org(&name) && !reserved::email_matches_org(&ctx.email, &name) {
            return Err(HookError::ReservedOrg(name));
        }

        let now = Utc::now();

        if let Some(limit) = self.policy.endpoint_limit(ctx.plan) {
            let live = store::live_endpoints_of_tenant(&self.db, &ctx.tenant, now).await?;
            if live.len() as u32 >= limit {
                return Err(HookError::QuotaExceeded {
                    plan: ctx.plan.to_string(),
                    limit,
                });
            }
        }

        // Fast-path check; the unique index below still decides races
        if store::find_live_endpoint(&self.db, &name, now).await?.is_some() {
            return Err(HookError::Conflict(name));
        }

        // An expired or soft-deleted holder no longer owns the name
        store::release_stale_endpoint(&self.db, &name, now).await?;

        let expires_at = self.policy.endpoint_ttl(ctx.plan).map(|ttl| now + ttl);

        let record = store::insert_endpoint(
            &self.db,
            &name,
            Some(&ctx.tenant),
            ctx.plan.as_str(),
            expires_at,
            now,
        )
        .await
        .map_err(|err| {
            if store::is_unique_violation(&err) {
                HookError::Conflict(name.clone())
            } else {
                error!(endpoint = %name, tenant = %ctx.tenant, "unable to insert endpoint: {err}");
                HookError::Database(err)
            }
        })?;

        info!(endpoint = %name, tenant = %ctx.tenant, plan = %ctx.plan, "Endpoint created");

        Ok(record)
    }

    /// Claim a random name for an anonymous caller
    pub async fn provision_guest(&self) -> Result<endpoint::Model, HookError> {
        let now = Utc::now();
        let expires_at = self
            .policy
            .endpoint_ttl(Plan::Guest)
            .map(|ttl| now + ttl);

        // Collisions in 10 random hex chars are rare; retry a couple of
        // times rather than reserving names up front
        for _ in 0..3 {
            let name: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(self.policy.name_max)
                .collect();

            match store::insert_endpoint(&self.db, &name, None, Plan::Guest.as_str(), expires_at, now)
                .await
            {
                Ok(record) => {
                    info!(endpoint = %name, "Guest endpoint created");
                    return Ok(record);
                }
                Err(err) if store::is_unique_violation(&err) => continue,
                Err(err) => {
                    error!("unable to insert guest endpoint: {err}");
                    return Err(HookError::Database(err));
                }
            }
        }

        Err(HookError::Internal(
            "could not find a free guest endpoint name".to_string(),
        ))
    }

    /// Live endpoints owned by a tenant
    pub async fn endpoints_of(&self, tenant: &str) -> Result<Vec<endpoint::Model>, HookError> {
        Ok(store::live_endpoints_of_tenant(&self.db, tenant, Utc::now()).await?)
    }
}
