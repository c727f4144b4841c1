//! Error taxonomy shared by every core component

use sea_orm::DbErr;
use thiserror::Error;

/// Core errors
///
/// Validation and policy errors carry enough detail for the caller to act;
/// database errors are logged with context where they occur and surface as a
/// generic failure at the API boundary.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("endpoint '{0}' is either not created or has expired")]
    NotFound(String),

    #[error("endpoint '{0}' already exists")]
    Conflict(String),

    #[error("endpoint should be {min} to {max} characters (lowercase letters, digits, hyphens)")]
    InvalidName { min: usize, max: usize },

    #[error("endpoint '{0}' is reserved")]
    Reserved(String),

    #[error("endpoint '{0}' is reserved; use a mail address issued by that organisation")]
    ReservedOrg(String),

    #[error("cannot hold more than {limit} endpoint(s) on the '{plan}' plan; consider upgrading to pro")]
    QuotaExceeded { plan: String, limit: u32 },

    #[error("endpoint '{0}' already has the maximum number of inspector sessions")]
    SessionLimit(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid plan '{0}'")]
    BadPlan(String),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl HookError {
    /// True for failures the caller cannot fix by changing the request
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            HookError::Serialize(_) | HookError::Database(_) | HookError::Internal(_)
        )
    }
}
