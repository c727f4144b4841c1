//! Broadcast dispatcher: persisted hook → every live inspector session
//!
//! Publishing serializes the hook once, then enqueues the frame onto each
//! session's outbound queue without blocking on the network. A session whose
//! queue no longer accepts frames is dead and is torn down on the spot.

use std::sync::Arc;

use tracing::{error, info};

use crate::hook::CapturedHook;
use crate::session::{EventFrame, SessionManager};

pub struct Broadcaster {
    sessions: Arc<SessionManager>,
}

impl Broadcaster {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Push one captured hook to every session watching its endpoint.
    ///
    /// Events for one endpoint are published in capture order; each session's
    /// queue preserves that order. No ordering is guaranteed across
    /// endpoints.
    pub fn publish(&self, endpoint: &str, hook: &CapturedHook) {
        let targets = self.sessions.senders(endpoint);
        if targets.is_empty() {
            return;
        }

        let payload = match serde_json::to_value(hook) {
            Ok(payload) => payload,
            Err(err) => {
                error!(endpoint = %endpoint, "unable to serialize hook for broadcast: {err}");
                return;
            }
        };
        let frame = EventFrame::hook(payload);

        info!(
            endpoint = %endpoint,
            num_sessions = targets.len(),
            token = %hook.token,
            "Broadcasting hook"
        );

        for (token, sender) in targets {
            if sender.send(frame.clone()).is_err() {
                // Receiver gone: the connection died without deregistering
                self.sessions.remove(endpoint, &token);
            }
        }
    }
}
