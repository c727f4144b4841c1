//! WebSocket transport for inspector sessions
//!
//! Each accepted connection runs two cooperating tasks that share no state
//! beyond the session's own queue:
//! - the **writer** drains the outbound queue into the socket and emits a
//!   liveness probe on a fixed interval,
//! - the **reader** consumes liveness acknowledgments and detects closes.
//!
//! Any write failure, read failure or missed liveness window removes the
//! session; removal closes the queue, which in turn stops the writer. Both
//! sides may race to remove — removal is idempotent.

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use hookpost_core::session::InspectorSession;

use crate::handlers::error_response;
use crate::models::{ErrorResponse, InspectQuery};
use crate::AppState;

/// Open an inspector session on an endpoint
///
/// The endpoint must resolve and the caller must present a valid token in
/// the `token` query parameter (browsers cannot set headers on WebSocket
/// handshakes). After the upgrade the socket receives one
/// `{event, payload}` frame per captured hook.
pub async fn open_inspector_session(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<InspectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let name = name.to_lowercase();

    let Some(token) = query.token else {
        warn!(endpoint = %name, "No token passed, rejecting inspector session");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Missing token".to_string(),
                code: Some("MISSING_AUTH".to_string()),
            }),
        )
            .into_response();
    };

    if let Err(err) = state.auth.validator.validate(&token) {
        warn!(endpoint = %name, "Rejecting inspector session: {err}");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid or expired token".to_string(),
                code: Some("INVALID_TOKEN".to_string()),
            }),
        )
            .into_response();
    }

    // Endpoint must exist and be unexpired before the upgrade completes
    if let Err(err) = state.registry.resolve(&name).await {
        let (status, body) = error_response(err);
        return (status, body).into_response();
    }

    ws.on_upgrade(move |socket| run_session(socket, state, name))
}

async fn run_session(mut socket: WebSocket, state: Arc<AppState>, endpoint: String) {
    let sessions = state.sessions.clone();

    let InspectorSession {
        token,
        endpoint,
        mut frames,
    } = match sessions.admit(&endpoint) {
        Ok(session) => session,
        Err(err) => {
            info!("Inspector session rejected: {err}");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    // Writer task: owns the socket's send half for the session's lifetime
    let ping_interval = sessions.config().ping_interval;
    let writer_sessions = sessions.clone();
    let writer_endpoint = endpoint.clone();
    let writer_token = token.clone();
    let mut writer = tokio::spawn(async move {
        let mut probe = tokio::time::interval(ping_interval);

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    let Some(frame) = frame else {
                        // Queue closed: the session was removed
                        break;
                    };
                    let Ok(text) = serde_json::to_string(&frame) else {
                        break;
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = probe.tick() => {
                    if writer_sessions.is_stale(&writer_endpoint, &writer_token) {
                        debug!(
                            endpoint = %writer_endpoint,
                            session_id = %writer_token,
                            "Liveness window missed"
                        );
                        break;
                    }
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        let _ = sink.send(Message::Close(None)).await;
    });

    // Reader loop: liveness acks in, disconnects out
    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => sessions.touch(&endpoint, &token),
                    Some(Ok(Message::Close(_))) | None => break,
                    // Inbound data frames from inspectors carry nothing
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(endpoint = %endpoint, session_id = %token, "Read error: {err}");
                        break;
                    }
                }
            }
            _ = &mut writer => break,
        }
    }

    sessions.remove(&endpoint, &token);
    writer.abort();
}
