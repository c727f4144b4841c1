//! End-to-end inspector session tests over real sockets
//!
//! Serves the router on a loopback listener and drives it with a WebSocket
//! client, the way a dashboard would.

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use futures::{Stream, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use hookpost_api::{ApiServer, ApiServerConfig, AppState};
use hookpost_auth::{JwtClaims, JwtValidator};
use hookpost_core::{EndpointRegistry, PlanPolicy};

const JWT_SECRET: &str = "test-secret";

async fn start_server() -> (std::net::SocketAddr, Router, Arc<AppState>) {
    let db = hookpost_db::connect("sqlite::memory:").await.unwrap();
    hookpost_db::migrate(&db).await.unwrap();

    let registry = Arc::new(EndpointRegistry::new(db, PlanPolicy::default()));
    let config = ApiServerConfig {
        domain: "hookpost.test".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        ..ApiServerConfig::default()
    };
    let server = ApiServer::new(config, registry);

    let state = server.state();
    let app = server.build_router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let served = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, served).await.unwrap();
    });

    (addr, app, state)
}

fn bearer_token() -> String {
    let claims = JwtClaims::new(
        "tenant-1".to_string(),
        "dev@acme.io".to_string(),
        "pro".to_string(),
        chrono::Duration::hours(1),
    );
    JwtValidator::encode(JWT_SECRET.as_bytes(), &claims).unwrap()
}

async fn provision_demo(app: &Router, token: &str) {
    let request = Request::builder()
        .uri("/api/endpoints")
        .method("POST")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(
            serde_json::to_string(&json!({ "endpoint": "demo" })).unwrap(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
}

async fn send_hook(app: &Router, body: &str) -> String {
    let request = Request::builder()
        .uri("/api/hook/demo/events")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_success());

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let record: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    record["token"].as_str().unwrap().to_string()
}

/// Wait until the session table reaches the expected size
async fn wait_for_sessions(state: &AppState, endpoint: &str, count: usize) {
    for _ in 0..200 {
        if state.sessions.session_count(endpoint) == count {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {count} session(s) on '{endpoint}', found {}",
        state.sessions.session_count(endpoint)
    );
}

/// Read frames until a text frame arrives, skipping pings
async fn next_event(
    socket: &mut (impl Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
) -> serde_json::Value {
    loop {
        let msg = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");

        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_inspector_receives_hooks_in_order() {
    let (addr, app, state) = start_server().await;
    let token = bearer_token();
    provision_demo(&app, &token).await;

    let (mut socket, _) =
        connect_async(format!("ws://{addr}/api/inspect/demo?token={token}"))
            .await
            .expect("websocket handshake failed");

    wait_for_sessions(&state, "demo", 1).await;

    let mut tokens = Vec::new();
    for i in 0..3 {
        tokens.push(send_hook(&app, &format!(r#"{{"seq":{i}}}"#)).await);
    }

    for expected in &tokens {
        let frame = next_event(&mut socket).await;
        assert_eq!(frame["event"], "hook");
        assert_eq!(frame["payload"]["token"].as_str().unwrap(), expected);
        assert_eq!(frame["payload"]["endpoint"], "demo");
    }

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_fan_out_reaches_every_session() {
    let (addr, app, state) = start_server().await;
    let token = bearer_token();
    provision_demo(&app, &token).await;

    let url = format!("ws://{addr}/api/inspect/demo?token={token}");
    let (mut first, _) = connect_async(&url).await.unwrap();
    let (mut second, _) = connect_async(&url).await.unwrap();

    wait_for_sessions(&state, "demo", 2).await;

    let hook_token = send_hook(&app, r#"{"ping":true}"#).await;

    for socket in [&mut first, &mut second] {
        let frame = next_event(socket).await;
        assert_eq!(frame["payload"]["token"].as_str().unwrap(), hook_token);
    }
}

#[tokio::test]
async fn test_disconnect_cleans_up_session() {
    let (addr, app, state) = start_server().await;
    let token = bearer_token();
    provision_demo(&app, &token).await;

    let (mut socket, _) =
        connect_async(format!("ws://{addr}/api/inspect/demo?token={token}"))
            .await
            .unwrap();
    wait_for_sessions(&state, "demo", 1).await;

    socket.close(None).await.unwrap();
    wait_for_sessions(&state, "demo", 0).await;

    // Later hooks never reference the departed session
    send_hook(&app, "{}").await;
    assert_eq!(state.sessions.session_count("demo"), 0);
}

#[tokio::test]
async fn test_inspect_rejects_bad_token() {
    let (addr, app, _state) = start_server().await;
    provision_demo(&app, &bearer_token()).await;

    let result =
        connect_async(format!("ws://{addr}/api/inspect/demo?token=not-a-token")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_inspect_rejects_unknown_endpoint() {
    let (addr, _app, _state) = start_server().await;
    let token = bearer_token();

    let result =
        connect_async(format!("ws://{addr}/api/inspect/ghost?token={token}")).await;
    assert!(result.is_err());
}
