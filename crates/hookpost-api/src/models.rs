use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use hookpost_core::{Availability, CapturedHook};

/// Request to claim a named endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionEndpointRequest {
    /// Desired subdomain name
    pub endpoint: String,
}

/// One claimed endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointInfo {
    /// Subdomain name
    pub endpoint: String,
    /// Full public hook URL
    pub url: String,
    /// Plan tier the endpoint was provisioned under
    pub plan: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiry; absent for endpoints that never expire
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A tenant's endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointList {
    pub endpoints: Vec<EndpointInfo>,
    pub total: usize,
}

/// Availability status for a requested name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Taken,
    Reserved,
    ReservedOrg,
    Invalid,
}

impl From<Availability> for AvailabilityStatus {
    fn from(value: Availability) -> Self {
        match value {
            Availability::Available => AvailabilityStatus::Available,
            Availability::Taken => AvailabilityStatus::Taken,
            Availability::Reserved => AvailabilityStatus::Reserved,
            Availability::ReservedOrg => AvailabilityStatus::ReservedOrg,
            Availability::Invalid => AvailabilityStatus::Invalid,
        }
    }
}

/// Availability check result
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub endpoint: String,
    pub status: AvailabilityStatus,
    /// Human-readable explanation
    pub message: String,
}

/// One captured hook request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HookRecord {
    /// Shareable correlation token
    pub token: String,
    /// Endpoint the hook arrived on
    pub endpoint: String,
    /// HTTP method, lowercase
    pub method: String,
    pub path: String,
    pub source_ip: String,
    pub content_type: String,
    /// Raw body; empty when the plan ceiling truncated it
    pub content: String,
    /// Original body size in bytes
    pub content_size: i32,
    /// Response code returned to the sender
    pub response_code: u16,
    /// Ordered header multimap
    pub headers: Vec<(String, String)>,
    /// Ordered query multimap
    pub query: Vec<(String, String)>,
    /// Form fields, present only for form content types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Vec<(String, String)>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CapturedHook> for HookRecord {
    fn from(hook: CapturedHook) -> Self {
        Self {
            token: hook.token,
            endpoint: hook.endpoint,
            method: hook.method.as_str().to_string(),
            path: hook.path,
            source_ip: hook.source_ip,
            content_type: hook.content_type,
            content: hook.content,
            content_size: hook.content_size,
            response_code: hook.response_code,
            headers: hook.headers,
            query: hook.query,
            form_data: hook.form_data,
            created_at: hook.created_at,
            expires_at: hook.expires_at,
        }
    }
}

/// Endpoint request history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub requests: Vec<HookRecord>,
}

/// Query parameters for request history pagination
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryQuery {
    /// Page size (default: 20, max: 100)
    #[serde(default)]
    pub limit: Option<u64>,
    /// Pagination offset (default: 0)
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Aggregate statistics for one endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub endpoint: String,
    pub total_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub plan: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Endpoints with at least one live inspector session
    pub watched_endpoints: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Query parameter carrying the inspector's auth token
#[derive(Debug, Clone, Deserialize)]
pub struct InspectQuery {
    #[serde(default)]
    pub token: Option<String>,
}
