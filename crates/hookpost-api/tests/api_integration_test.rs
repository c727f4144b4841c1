//! Integration tests for the REST surface
//!
//! Exercises the router directly with an in-memory SQLite database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

use hookpost_api::{models::*, ApiServer, ApiServerConfig};
use hookpost_auth::{JwtClaims, JwtValidator};
use hookpost_core::{EndpointRegistry, PlanPolicy};

const JWT_SECRET: &str = "test-secret";

/// Helper to create an in-memory database with migrations applied
async fn create_test_db() -> DatabaseConnection {
    let db = hookpost_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    hookpost_db::migrate(&db).await.expect("Failed to run migrations");

    db
}

/// Helper to create a test API server
fn create_test_server(db: DatabaseConnection) -> ApiServer {
    let registry = Arc::new(EndpointRegistry::new(db, PlanPolicy::default()));
    let config = ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        domain: "hookpost.test".to_string(),
        enable_cors: true,
        jwt_secret: JWT_SECRET.to_string(),
        ..ApiServerConfig::default()
    };

    ApiServer::new(config, registry)
}

fn bearer_token(tenant: &str, email: &str, plan: &str) -> String {
    let claims = JwtClaims::new(
        tenant.to_string(),
        email.to_string(),
        plan.to_string(),
        chrono::Duration::hours(1),
    );
    JwtValidator::encode(JWT_SECRET.as_bytes(), &claims).unwrap()
}

async fn provision(app: &Router, token: &str, name: &str) -> StatusCode {
    let request = Request::builder()
        .uri("/api/endpoints")
        .method("POST")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(
            serde_json::to_string(&json!({ "endpoint": name })).unwrap(),
        ))
        .unwrap();

    app.clone().oneshot(request).await.unwrap().status()
}

async fn capture(app: &Router, name: &str, path: &str, body: &str) -> (StatusCode, HookRecord) {
    let request = Request::builder()
        .uri(format!("/api/hook/{name}{path}"))
        .method("POST")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let record: HookRecord = serde_json::from_slice(&bytes).unwrap();

    (status, record)
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_server(create_test_db().await).build_router();

    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.watched_endpoints, 0);
}

#[tokio::test]
async fn test_availability_lifecycle() {
    let app = create_test_server(create_test_db().await).build_router();

    let check = |app: Router, name: &'static str| async move {
        let request = Request::builder()
            .uri(format!("/api/endpoints/exists/{name}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let availability: AvailabilityResponse = serde_json::from_slice(&body).unwrap();
        availability.status
    };

    assert_eq!(
        check(app.clone(), "demo").await,
        AvailabilityStatus::Available
    );

    let token = bearer_token("tenant-1", "dev@acme.io", "pro");
    assert_eq!(provision(&app, &token, "demo").await, StatusCode::OK);

    assert_eq!(check(app.clone(), "demo").await, AvailabilityStatus::Taken);
    assert_eq!(
        check(app.clone(), "admin").await,
        AvailabilityStatus::Reserved
    );
    assert_eq!(check(app, "ab").await, AvailabilityStatus::Invalid);
}

#[tokio::test]
async fn test_provision_requires_auth() {
    let app = create_test_server(create_test_db().await).build_router();

    let request = Request::builder()
        .uri("/api/endpoints")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"endpoint":"demo"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_provision_conflict() {
    let app = create_test_server(create_test_db().await).build_router();

    let first = bearer_token("tenant-1", "dev@acme.io", "pro");
    let second = bearer_token("tenant-2", "dev@other.io", "pro");

    assert_eq!(provision(&app, &first, "demo").await, StatusCode::OK);
    assert_eq!(provision(&app, &second, "demo").await, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_free_plan_quota_exceeded() {
    let app = create_test_server(create_test_db().await).build_router();

    let token = bearer_token("tenant-1", "dev@acme.io", "free");

    assert_eq!(provision(&app, &token, "hook").await, StatusCode::OK);
    assert_eq!(provision(&app, &token, "hooks").await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_capture_and_history_roundtrip() {
    let app = create_test_server(create_test_db().await).build_router();

    let token = bearer_token("tenant-1", "dev@acme.io", "pro");
    assert_eq!(provision(&app, &token, "demo").await, StatusCode::OK);

    let body = "x".repeat(5_000);
    let (status, record) = capture(&app, "demo", "/payments/settled?source=ci", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record.endpoint, "demo");
    assert_eq!(record.method, "post");
    assert_eq!(record.path, "/payments/settled");
    assert_eq!(record.content, body);
    assert_eq!(record.content_size, 5_000);
    assert_eq!(record.response_code, 200);
    assert_eq!(record.source_ip, "203.0.113.7");
    assert!(record
        .query
        .contains(&("source".to_string(), "ci".to_string())));
    // Paid captures are retained indefinitely
    assert!(record.expires_at.is_none());

    // History returns the capture
    let request = Request::builder()
        .uri("/api/endpoints/demo/history?limit=10&offset=0")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let history: HistoryResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(history.requests.len(), 1);
    assert_eq!(history.requests[0].token, record.token);

    // Single-request lookup by correlation token
    let request = Request::builder()
        .uri(format!("/api/requests/{}", record.token))
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Stats count the capture as a success
    let request = Request::builder()
        .uri("/api/endpoints/demo/stats")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let stats: StatsResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats.total_count, 1);
    assert_eq!(stats.success_count, 1);
    assert_eq!(stats.failure_count, 0);
    assert_eq!(stats.plan, "pro");
}

#[tokio::test]
async fn test_oversize_capture_truncated_with_413() {
    let app = create_test_server(create_test_db().await).build_router();

    let token = bearer_token("tenant-1", "dev@acme.io", "free");
    assert_eq!(provision(&app, &token, "hook").await, StatusCode::OK);

    let body = "x".repeat(11_000);
    let (status, record) = capture(&app, "hook", "/", &body).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(record.content, "");
    assert_eq!(record.content_size, 11_000);
    assert_eq!(record.response_code, 413);
    // Entry-tier captures carry a retention window
    assert!(record.expires_at.is_some());
}

#[tokio::test]
async fn test_capture_on_unknown_endpoint() {
    let app = create_test_server(create_test_db().await).build_router();

    let request = Request::builder()
        .uri("/api/hook/ghost/events")
        .method("POST")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_hook_persists_fields() {
    let app = create_test_server(create_test_db().await).build_router();

    let token = bearer_token("tenant-1", "dev@acme.io", "pro");
    assert_eq!(provision(&app, &token, "demo").await, StatusCode::OK);

    let request = Request::builder()
        .uri("/api/hook/demo/signup")
        .method("POST")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("user=amy&user=bob&source=form"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let record: HookRecord = serde_json::from_slice(&bytes).unwrap();

    let form = record.form_data.expect("form fields must be recorded");
    assert_eq!(
        form,
        vec![
            ("user".to_string(), "amy".to_string()),
            ("user".to_string(), "bob".to_string()),
            ("source".to_string(), "form".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_sweep_prunes_expired_history() {
    use hookpost_core::ExpirySweeper;
    use hookpost_db::store;

    let db = create_test_db().await;
    let app = create_test_server(db.clone()).build_router();

    let token = bearer_token("tenant-1", "dev@acme.io", "free");
    assert_eq!(provision(&app, &token, "hook").await, StatusCode::OK);

    let (_, kept) = capture(&app, "hook", "/", "{}").await;

    // Backdate a second capture past its retention window
    let endpoint = store::find_endpoint(&db, "hook").await.unwrap().unwrap();
    let now = chrono::Utc::now();
    store::insert_request(
        &db,
        store::NewCapturedRequest {
            token: "stale".to_string(),
            endpoint_id: endpoint.id,
            method: "post".to_string(),
            path: "/".to_string(),
            source_ip: "203.0.113.7".to_string(),
            content_type: "application/json".to_string(),
            content: "{}".to_string(),
            content_size: 2,
            response_code: 200,
            headers: "[]".to_string(),
            query: "[]".to_string(),
            form_data: None,
            created_at: now - chrono::Duration::hours(7),
            expires_at: Some(now - chrono::Duration::hours(1)),
        },
    )
    .await
    .unwrap();

    ExpirySweeper::new(db, std::time::Duration::from_secs(86_400))
        .sweep_once()
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/api/endpoints/hook/history")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let history: HistoryResponse = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(history.requests.len(), 1);
    assert_eq!(history.requests[0].token, kept.token);
}

#[tokio::test]
async fn test_history_is_owner_only() {
    let app = create_test_server(create_test_db().await).build_router();

    let owner = bearer_token("tenant-1", "dev@acme.io", "pro");
    let stranger = bearer_token("tenant-2", "dev@other.io", "pro");

    assert_eq!(provision(&app, &owner, "demo").await, StatusCode::OK);

    let request = Request::builder()
        .uri("/api/endpoints/demo/history")
        .header("authorization", format!("Bearer {stranger}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guest_endpoint_flow() {
    let app = create_test_server(create_test_db().await).build_router();

    let request = Request::builder()
        .uri("/api/endpoints/guest")
        .method("POST")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let info: EndpointInfo = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info.plan, "guest");
    assert!(info.expires_at.is_some());
    assert!(info.url.ends_with(".hookpost.test"));

    // The random name accepts hooks immediately
    let (status, record) = capture(&app, &info.endpoint, "/", "{}").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record.endpoint, info.endpoint);
}
