//! Live inspector sessions
//!
//! The session table maps an endpoint name to the set of sessions currently
//! watching it. Structural mutation (insert/remove) is guarded per shard by
//! the map; message delivery never holds a lock across network I/O — each
//! session owns an unbounded outbound queue and the transport-side writer
//! task performs the actual socket writes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::HookError;

/// One frame pushed to an inspector: event kind plus payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFrame {
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventFrame {
    pub const HOOK: &'static str = "hook";

    pub fn hook(payload: serde_json::Value) -> Self {
        Self {
            event: Self::HOOK.to_string(),
            payload,
        }
    }
}

/// Liveness and fan-out knobs for inspector sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Soft cap on concurrent sessions per endpoint
    pub max_sessions_per_endpoint: usize,
    /// How often the writer task emits a liveness probe
    pub ping_interval: Duration,
    /// Longest tolerated gap since the last liveness acknowledgment
    pub liveness_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_endpoint: 5,
            ping_interval: Duration::from_secs(6),
            liveness_timeout: Duration::from_secs(10),
        }
    }
}

struct Session {
    sender: mpsc::UnboundedSender<EventFrame>,
    last_seen: Instant,
}

/// Receiver half handed to the transport when a session is admitted.
/// Dropping it (or the manager removing the session) closes the queue,
/// which is the single shutdown signal for the connection's two tasks.
#[derive(Debug)]
pub struct InspectorSession {
    pub token: String,
    pub endpoint: String,
    pub frames: mpsc::UnboundedReceiver<EventFrame>,
}

/// Per-endpoint table of live inspector sessions
pub struct SessionManager {
    sessions: DashMap<String, HashMap<String, Session>>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register a new session for an endpoint that already resolved
    ///
    /// Enforces the per-endpoint soft cap; the caller is expected to have
    /// resolved the endpoint through the registry first.
    pub fn admit(&self, endpoint: &str) -> Result<InspectorSession, HookError> {
        let endpoint = endpoint.to_lowercase();
        let (sender, frames) = mpsc::unbounded_channel();
        let token = Uuid::new_v4().to_string();

        {
            let mut table = self.sessions.entry(endpoint.clone()).or_default();
            if table.len() >= self.config.max_sessions_per_endpoint {
                return Err(HookError::SessionLimit(endpoint));
            }
            table.insert(
                token.clone(),
                Session {
                    sender,
                    last_seen: Instant::now(),
                },
            );
        }

        info!(endpoint = %endpoint, session_id = %token, "Inspector session admitted");

        Ok(InspectorSession {
            token,
            endpoint,
            frames,
        })
    }

    /// Remove a session; idempotent. Dropping the stored sender closes the
    /// session's queue, which terminates its writer task. Removing the last
    /// session of an endpoint removes the endpoint's table entry too.
    pub fn remove(&self, endpoint: &str, token: &str) {
        let endpoint = endpoint.to_lowercase();
        let removed = match self.sessions.get_mut(&endpoint) {
            Some(mut table) => table.remove(token).is_some(),
            None => false,
        };

        if removed {
            info!(endpoint = %endpoint, session_id = %token, "Inspector session removed");
        }

        self.sessions.remove_if(&endpoint, |_, table| table.is_empty());
    }

    /// Record a liveness acknowledgment for a session
    pub fn touch(&self, endpoint: &str, token: &str) {
        if let Some(mut table) = self.sessions.get_mut(&endpoint.to_lowercase()) {
            if let Some(session) = table.get_mut(token) {
                session.last_seen = Instant::now();
            }
        }
    }

    /// Whether a session missed its liveness window (or was already removed)
    pub fn is_stale(&self, endpoint: &str, token: &str) -> bool {
        match self.sessions.get(&endpoint.to_lowercase()) {
            Some(table) => match table.get(token) {
                Some(session) => session.last_seen.elapsed() > self.config.liveness_timeout,
                None => true,
            },
            None => true,
        }
    }

    /// Snapshot the outbound queues of an endpoint's sessions.
    ///
    /// Senders are cloned under the shard lock and enqueued to after it is
    /// released, so a slow consumer never blocks the table.
    pub(crate) fn senders(&self, endpoint: &str) -> Vec<(String, mpsc::UnboundedSender<EventFrame>)> {
        match self.sessions.get(&endpoint.to_lowercase()) {
            Some(table) => table
                .iter()
                .map(|(token, session)| (token.clone(), session.sender.clone()))
                .collect(),
            None => {
                debug!(endpoint = %endpoint, "No active sessions");
                Vec::new()
            }
        }
    }

    /// Number of live sessions on one endpoint
    pub fn session_count(&self, endpoint: &str) -> usize {
        self.sessions
            .get(&endpoint.to_lowercase())
            .map_or(0, |table| table.len())
    }

    /// Number of endpoints with at least one live session
    pub fn watched_endpoints(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
