//! JWT Authentication Middleware
//!
//! Validates the bearer token on protected endpoints and makes the verified
//! tenant context available to handlers via Axum's Extension. Token issuance
//! happens upstream; the claims are trusted verbatim here.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use hookpost_auth::JwtValidator;
use hookpost_core::{Plan, TenantContext};

use crate::models::ErrorResponse;

/// JWT validation state shared across middleware instances
#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<JwtValidator>,
}

impl AuthState {
    /// Create new auth state with the given secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            validator: Arc::new(JwtValidator::new(secret)),
        }
    }
}

fn unauthorized(message: &str, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
            code: Some(code.to_string()),
        }),
    )
}

/// Authentication middleware that validates bearer tokens
///
/// Extracts the token from "Authorization: Bearer <token>", validates
/// signature and expiration, and injects [`TenantContext`] into request
/// extensions.
pub async fn require_auth(
    state: axum::extract::State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header", "MISSING_AUTH"))?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        unauthorized(
            "Invalid Authorization header format. Expected 'Bearer <token>'",
            "INVALID_AUTH_FORMAT",
        )
    })?;

    let claims = state
        .validator
        .validate(token)
        .map_err(|e| unauthorized(&format!("Invalid or expired token: {e}"), "INVALID_TOKEN"))?;

    let plan = Plan::parse(&claims.plan)
        .map_err(|_| unauthorized("Token carries an unknown plan", "INVALID_TOKEN"))?;

    request.extensions_mut().insert(TenantContext {
        tenant: claims.sub,
        email: claims.email,
        plan,
    });

    Ok(next.run(request).await)
}
