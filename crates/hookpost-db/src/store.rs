//! Query layer over the endpoints and captured_requests tables
//!
//! Every query the core needs lives here so the components above it depend
//! on this contract rather than on SeaORM query-building details.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::entities::{captured_request, endpoint};

/// Insert parameters for one captured request
#[derive(Debug, Clone)]
pub struct NewCapturedRequest {
    pub token: String,
    pub endpoint_id: i64,
    pub method: String,
    pub path: String,
    pub source_ip: String,
    pub content_type: String,
    pub content: String,
    pub content_size: i32,
    pub response_code: i32,
    pub headers: String,
    pub query: String,
    pub form_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Aggregate request counts for one endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
}

/// True when the error is the unique-index violation raised by a losing
/// provisioning racer
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn not_deleted() -> Condition {
    Condition::all().add(endpoint::Column::IsDeleted.eq(false))
}

fn live_at(now: DateTime<Utc>) -> Condition {
    not_deleted().add(
        Condition::any()
            .add(endpoint::Column::ExpiresAt.is_null())
            .add(endpoint::Column::ExpiresAt.gt(now)),
    )
}

/// Look up an endpoint by name, excluding soft-deleted rows.
///
/// Expired rows are returned; callers that need a hook-accepting endpoint
/// should use [`find_live_endpoint`].
pub async fn find_endpoint(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<endpoint::Model>, DbErr> {
    endpoint::Entity::find()
        .filter(endpoint::Column::Name.eq(name))
        .filter(not_deleted())
        .one(db)
        .await
}

/// Look up an endpoint row by id, excluding soft-deleted rows
pub async fn find_endpoint_by_id(
    db: &DatabaseConnection,
    id: i64,
) -> Result<Option<endpoint::Model>, DbErr> {
    endpoint::Entity::find_by_id(id)
        .filter(not_deleted())
        .one(db)
        .await
}

/// Look up an endpoint that is neither soft-deleted nor expired
pub async fn find_live_endpoint(
    db: &DatabaseConnection,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<endpoint::Model>, DbErr> {
    endpoint::Entity::find()
        .filter(endpoint::Column::Name.eq(name))
        .filter(live_at(now))
        .one(db)
        .await
}

/// All live endpoints owned by a tenant, for quota checks and listings
pub async fn live_endpoints_of_tenant(
    db: &DatabaseConnection,
    tenant: &str,
    now: DateTime<Utc>,
) -> Result<Vec<endpoint::Model>, DbErr> {
    endpoint::Entity::find()
        .filter(endpoint::Column::Tenant.eq(tenant))
        .filter(live_at(now))
        .order_by_asc(endpoint::Column::CreatedAt)
        .all(db)
        .await
}

/// Insert a new endpoint row.
///
/// The unique index on `name` is the source of truth for claim races: a
/// losing concurrent insert surfaces as a [`DbErr`] for which
/// [`is_unique_violation`] returns true.
pub async fn insert_endpoint(
    db: &DatabaseConnection,
    name: &str,
    tenant: Option<&str>,
    plan: &str,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<endpoint::Model, DbErr> {
    endpoint::ActiveModel {
        name: Set(name.to_string()),
        tenant: Set(tenant.map(str::to_string)),
        plan: Set(plan.to_string()),
        created_at: Set(now),
        expires_at: Set(expires_at),
        is_deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Hard-delete rows holding `name` that are expired or soft-deleted, so the
/// unique index only guards live claims. Returns the number of rows freed.
pub async fn release_stale_endpoint(
    db: &DatabaseConnection,
    name: &str,
    now: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let stale = Condition::any()
        .add(endpoint::Column::IsDeleted.eq(true))
        .add(endpoint::Column::ExpiresAt.lte(now));

    let res = endpoint::Entity::delete_many()
        .filter(endpoint::Column::Name.eq(name))
        .filter(stale)
        .exec(db)
        .await?;

    Ok(res.rows_affected)
}

/// Persist one captured request, returning the stored row with its id
pub async fn insert_request(
    db: &DatabaseConnection,
    new: NewCapturedRequest,
) -> Result<captured_request::Model, DbErr> {
    captured_request::ActiveModel {
        token: Set(new.token),
        endpoint_id: Set(new.endpoint_id),
        method: Set(new.method),
        path: Set(new.path),
        source_ip: Set(new.source_ip),
        content_type: Set(new.content_type),
        content: Set(new.content),
        content_size: Set(new.content_size),
        response_code: Set(new.response_code),
        headers: Set(new.headers),
        query: Set(new.query),
        form_data: Set(new.form_data),
        created_at: Set(new.created_at),
        expires_at: Set(new.expires_at),
        is_deleted: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Paginated request history for one endpoint, newest first
pub async fn request_history(
    db: &DatabaseConnection,
    endpoint_id: i64,
    limit: u64,
    offset: u64,
) -> Result<Vec<captured_request::Model>, DbErr> {
    captured_request::Entity::find()
        .filter(captured_request::Column::EndpointId.eq(endpoint_id))
        .filter(captured_request::Column::IsDeleted.eq(false))
        .order_by_desc(captured_request::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
}

/// Fetch a single request by its shareable correlation token
pub async fn find_request_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<captured_request::Model>, DbErr> {
    captured_request::Entity::find()
        .filter(captured_request::Column::Token.eq(token))
        .filter(captured_request::Column::IsDeleted.eq(false))
        .one(db)
        .await
}

/// Total/success/failure counts for one endpoint's stored requests
pub async fn request_counts(
    db: &DatabaseConnection,
    endpoint_id: i64,
) -> Result<RequestCounts, DbErr> {
    let base = captured_request::Entity::find()
        .filter(captured_request::Column::EndpointId.eq(endpoint_id))
        .filter(captured_request::Column::IsDeleted.eq(false));

    let total = base.clone().count(db).await?;
    let success = base
        .filter(captured_request::Column::ResponseCode.eq(200))
        .count(db)
        .await?;

    Ok(RequestCounts {
        total,
        success,
        failure: total - success,
    })
}

/// Bulk-delete request rows past their expiry. Naturally idempotent:
/// a second run with no new captures deletes nothing.
pub async fn delete_expired_requests(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let res = captured_request::Entity::delete_many()
        .filter(captured_request::Column::ExpiresAt.is_not_null())
        .filter(captured_request::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;

    Ok(res.rows_affected)
}

/// Bulk-delete endpoint rows past their expiry, freeing their names
pub async fn delete_expired_endpoints(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let res = endpoint::Entity::delete_many()
        .filter(endpoint::Column::ExpiresAt.is_not_null())
        .filter(endpoint::Column::ExpiresAt.lte(now))
        .exec(db)
        .await?;

    Ok(res.rows_affected)
}
