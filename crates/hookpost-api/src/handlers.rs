use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use hookpost_core::{Availability, HookError, HttpMethod, RawHook, TenantContext};
use hookpost_db::store;

use crate::models::*;
use crate::AppState;

/// Map a core error to the HTTP surface
///
/// Internal failures surface as a generic message; their context was already
/// logged where they occurred.
pub(crate) fn error_response(err: HookError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        HookError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        HookError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
        HookError::InvalidName { .. } => (StatusCode::BAD_REQUEST, "BAD_NAME"),
        HookError::Reserved(_) => (StatusCode::BAD_REQUEST, "RESERVED"),
        HookError::ReservedOrg(_) => (StatusCode::BAD_REQUEST, "RESERVED_ORG"),
        HookError::QuotaExceeded { .. } => (StatusCode::BAD_REQUEST, "QUOTA_EXCEEDED"),
        HookError::SessionLimit(_) => (StatusCode::TOO_MANY_REQUESTS, "SESSION_LIMIT"),
        HookError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
        HookError::BadPlan(_) => (StatusCode::BAD_REQUEST, "BAD_PLAN"),
        HookError::Serialize(_) | HookError::Database(_) | HookError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
    };

    let error = if err.is_internal() {
        "Oops! Something went wrong".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(ErrorResponse {
            error,
            code: Some(code.to_string()),
        }),
    )
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        watched_endpoints: state.sessions.watched_endpoints(),
    })
}

/// Check whether an endpoint name can still be claimed
#[utoipa::path(
    get,
    path = "/api/endpoints/exists/{name}",
    params(
        ("name" = String, Path, description = "Requested endpoint name")
    ),
    responses(
        (status = 200, description = "Availability status", body = AvailabilityResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<AvailabilityResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!(endpoint = %name, "Checking endpoint availability");

    let availability = state
        .registry
        .check_availability(&name)
        .await
        .map_err(error_response)?;

    let policy = state.registry.policy();
    let message = match availability {
        Availability::Available => "It's available. Claim it and make it yours.".to_string(),
        Availability::Taken => "That endpoint is already taken. Try something else?".to_string(),
        Availability::Reserved => "Endpoint is reserved.".to_string(),
        Availability::ReservedOrg => {
            "Endpoint is reserved. You can claim it with a mail address issued by that organisation."
                .to_string()
        }
        Availability::Invalid => format!(
            "Endpoint should be {} to {} characters.",
            policy.name_min, policy.name_max
        ),
    };

    Ok(Json(AvailabilityResponse {
        endpoint: name.to_lowercase(),
        status: availability.into(),
        message,
    }))
}

/// Claim a named endpoint for the authenticated tenant
#[utoipa::path(
    post,
    path = "/api/endpoints",
    request_body = ProvisionEndpointRequest,
    responses(
        (status = 200, description = "Endpoint provisioned", body = EndpointInfo),
        (status = 400, description = "Invalid, reserved or quota-limited request", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "endpoints"
)]
pub async fn provision_endpoint(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
    Json(req): Json<ProvisionEndpointRequest>,
) -> Result<Json<EndpointInfo>, (StatusCode, Json<ErrorResponse>)> {
    info!(endpoint = %req.endpoint, tenant = %ctx.tenant, "Provision endpoint request received");

    let record = state
        .registry
        .provision(&req.endpoint, &ctx)
        .await
        .map_err(error_response)?;

    Ok(Json(state.endpoint_info(record)))
}

/// Claim a randomly named endpoint without an account
#[utoipa::path(
    post,
    path = "/api/endpoints/guest",
    responses(
        (status = 200, description = "Guest endpoint provisioned", body = EndpointInfo),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "endpoints"
)]
pub async fn provision_guest_endpoint(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EndpointInfo>, (StatusCode, Json<ErrorResponse>)> {
    let record = state
        .registry
        .provision_guest()
        .await
        .map_err(error_response)?;

    Ok(Json(state.endpoint_info(record)))
}

/// List the authenticated tenant's live endpoints
#[utoipa::path(
    get,
    path = "/api/endpoints",
    responses(
        (status = 200, description = "Tenant endpoints", body = EndpointList),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "endpoints"
)]
pub async fn list_endpoints(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
) -> Result<Json<EndpointList>, (StatusCode, Json<ErrorResponse>)> {
    debug!(tenant = %ctx.tenant, "Listing tenant endpoints");

    let records = state
        .registry
        .endpoints_of(&ctx.tenant)
        .await
        .map_err(error_response)?;

    let endpoints: Vec<EndpointInfo> = records
        .into_iter()
        .map(|record| state.endpoint_info(record))
        .collect();
    let total = endpoints.len();

    Ok(Json(EndpointList { endpoints, total }))
}

/// Receive one hook on the endpoint root path
pub async fn capture_hook_root(
    state: State<Arc<AppState>>,
    Path(name): Path<String>,
    query: Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<HookRecord>), (StatusCode, Json<ErrorResponse>)> {
    handle_capture(state, name, "/".to_string(), query, method, headers, body).await
}

/// Receive one hook on a sub-path of the endpoint
#[utoipa::path(
    post,
    path = "/api/hook/{name}/{path}",
    params(
        ("name" = String, Path, description = "Target endpoint name"),
        ("path" = String, Path, description = "Arbitrary sub-path, recorded with the hook")
    ),
    request_body = String,
    responses(
        (status = 200, description = "Hook captured", body = HookRecord),
        (status = 413, description = "Hook captured with truncated content", body = HookRecord),
        (status = 404, description = "Endpoint unknown or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "hooks"
)]
pub async fn capture_hook(
    state: State<Arc<AppState>>,
    Path((name, path)): Path<(String, String)>,
    query: Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<HookRecord>), (StatusCode, Json<ErrorResponse>)> {
    let path = format!("/{path}");
    handle_capture(state, name, path, query, method, headers, body).await
}

async fn handle_capture(
    State(state): State<Arc<AppState>>,
    name: String,
    path: String,
    Query(query): Query<Vec<(String, String)>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<HookRecord>), (StatusCode, Json<ErrorResponse>)> {
    let method = HttpMethod::parse(method.as_str()).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Unsupported HTTP method {method}"),
                code: Some("BAD_METHOD".to_string()),
            }),
        )
    })?;

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();

    let header_pairs: Vec<(String, String)> = headers
        .iter()
        .map(|(key, value)| {
            (
                key.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let source_ip = source_ip_from(&headers);
    let content = String::from_utf8_lossy(&body).into_owned();

    let form_data = if content_type.contains(hookpost_core::hook::FORM_URLENCODED) {
        serde_urlencoded::from_str::<Vec<(String, String)>>(&content).ok()
    } else {
        None
    };

    let raw = RawHook {
        method,
        path,
        source_ip,
        content_type,
        content,
        headers: header_pairs,
        query,
        form_data,
    };

    let hook = state
        .ingestor
        .capture(&name, raw)
        .await
        .map_err(error_response)?;

    // Fan out to live inspectors after the record is durable
    state.broadcaster.publish(&name, &hook);

    let status =
        StatusCode::from_u16(hook.response_code).unwrap_or(StatusCode::OK);

    Ok((status, Json(hook.into())))
}

/// Best-effort peer address: proxies in front of the relay set the
/// forwarding headers, everything else falls back to unknown
fn source_ip_from(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|list| list.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Paginated request history for one endpoint
#[utoipa::path(
    get,
    path = "/api/endpoints/{name}/history",
    params(
        ("name" = String, Path, description = "Endpoint name"),
        ("limit" = Option<u64>, Query, description = "Page size (default: 20, max: 100)"),
        ("offset" = Option<u64>, Query, description = "Pagination offset (default: 0)")
    ),
    responses(
        (status = 200, description = "Request history", body = HistoryResponse),
        (status = 401, description = "Caller does not own this endpoint", body = ErrorResponse),
        (status = 404, description = "Endpoint unknown", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "hooks"
)]
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
    Path(name): Path<String>,
    Query(page): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(endpoint = %name, tenant = %ctx.tenant, "Fetch endpoint request history");

    let endpoint = state
        .registry
        .resolve_any(&name)
        .await
        .map_err(error_response)?;

    // Guest endpoints have no owner; named tenants only see their own
    if endpoint
        .tenant
        .as_ref()
        .is_some_and(|owner| *owner != ctx.tenant)
    {
        return Err(error_response(HookError::Unauthorized));
    }

    let limit = page.limit.unwrap_or(20).min(100);
    let offset = page.offset.unwrap_or(0);

    let rows = store::request_history(state.registry.db(), endpoint.id, limit, offset)
        .await
        .map_err(|err| error_response(HookError::Database(err)))?;

    let requests = rows
        .into_iter()
        .map(|row| {
            hookpost_core::CapturedHook::from_model(&endpoint.name, row).map(HookRecord::from)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(error_response)?;

    Ok(Json(HistoryResponse { requests }))
}

/// Fetch one captured request by its correlation token
#[utoipa::path(
    get,
    path = "/api/requests/{token}",
    params(
        ("token" = String, Path, description = "Correlation token of the request")
    ),
    responses(
        (status = 200, description = "Captured request", body = HookRecord),
        (status = 404, description = "No request with that token", body = ErrorResponse),
        (status = 401, description = "Caller does not own this endpoint", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "hooks"
)]
pub async fn get_request(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<TenantContext>,
    Path(token): Path<String>,
) -> Result<Json<HookRecord>, (StatusCode, Json<ErrorResponse>)> {
    debug!(token = %token, "Fetch request details by token");

    let db = state.registry.db();

    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No request found for token: {token}"),
                code: Some("NOT_FOUND".to_string()),
            }),
        )
    };

    let row = store::find_request_by_token(db, &token)
        .await
        .map_err(|err| error_response(HookError::Database(err)))?
        .ok_or_else(not_found)?;

    let endpoint = store::find_endpoint_by_id(db, row.endpoint_id)
        .await
        .map_err(|err| error_response(HookError::Database(err)))?
        .ok_or_else(not_found)?;

    if endpoint
        .tenant
        .as_ref()
        .is_some_and(|owner| *owner != ctx.tenant)
    {
        return Err(error_response(HookError::Unauthorized));
    }

    let hook = hookpost_core::CapturedHook::from_model(&endpoint.name, row)
        .map_err(error_response)?;

    Ok(Json(hook.into()))
}

/// Aggregate statistics for one endpoint
#[utoipa::path(
    get,
    path = "/api/endpoints/{name}/stats",
    params(
        ("name" = String, Path, description = "Endpoint name")
    ),
    responses(
        (status = 200, description = "Endpoint statistics", body = StatsResponse),
        (status = 404, description = "Endpoint unknown", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "endpoints"
)]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(endpoint = %name, "Request endpoint stats");

    // Expired endpoints still answer stats queries
    let endpoint = state
        .registry
        .resolve_any(&name)
        .await
        .map_err(error_response)?;

    let counts = store::request_counts(state.registry.db(), endpoint.id)
        .await
        .map_err(|err| error_response(HookError::Database(err)))?;

    Ok(Json(StatsResponse {
        endpoint: endpoint.name,
        total_count: counts.total,
        success_count: counts.success,
        failure_count: counts.failure,
        expires_at: endpoint.expires_at,
        plan: endpoint.plan,
    }))
}
