//! Hook ingestion pipeline
//!
//! The write path: resolve the endpoint, apply plan policy, normalize and
//! persist. A request is never silently dropped — an oversized body is
//! stored with empty content and a 413 response code so the inspecting user
//! still sees that something arrived, and a persistence failure surfaces to
//! the sender for its own retry logic.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::HookError;
use crate::hook::{CapturedHook, RawHook};
use crate::plan::Plan;
use crate::registry::EndpointRegistry;
use hookpost_db::store::{self, NewCapturedRequest};

pub struct HookIngestor {
    registry: Arc<EndpointRegistry>,
}

impl HookIngestor {
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self { registry }
    }

    /// Normalize, apply policy and persist one inbound hook
    pub async fn capture(
        &self,
        endpoint_name: &str,
        raw: RawHook,
    ) -> Result<CapturedHook, HookError> {
        let endpoint = self.registry.resolve(endpoint_name).await?;
        let plan = Plan::parse(&endpoint.plan)?;
        let policy = self.registry.policy();

        let content_size = raw.content.len();
        let ceiling = policy.content_ceiling(plan);
        let is_form = raw.is_form();

        // Over-ceiling bodies are recorded, not rejected: keep the metadata,
        // drop the payload
        let (content, response_code) = if content_size > ceiling {
            warn!(
                endpoint = %endpoint.name,
                plan = %plan,
                received_size = content_size,
                limit = ceiling,
                "Content exceeds plan ceiling, storing empty payload"
            );
            (String::new(), 413)
        } else {
            (raw.content, 200)
        };

        let now = Utc::now();
        // Fixed at capture time; later plan changes never touch it
        let expires_at = policy.retention(plan).map(|window| now + window);

        let headers = serde_json::to_string(&raw.headers)?;
        let query = serde_json::to_string(&raw.query)?;
        let form_data = if is_form {
            raw.form_data
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?
        } else {
            None
        };

        let record = store::insert_request(
            self.registry.db(),
            NewCapturedRequest {
                token: Uuid::new_v4().to_string(),
                endpoint_id: endpoint.id,
                method: raw.method.as_str().to_string(),
                path: raw.path,
                source_ip: raw.source_ip,
                content_type: raw.content_type,
                content,
                content_size: content_size as i32,
                response_code,
                headers,
                query,
                form_data,
                created_at: now,
                expires_at,
            },
        )
        .await
        .map_err(|err| {
            error!(endpoint = %endpoint.name, "unable to create request record: {err}");
            HookError::Database(err)
        })?;

        info!(
            endpoint = %endpoint.name,
            token = %record.token,
            response_code,
            "Hook captured"
        );

        CapturedHook::from_model(&endpoint.name, record)
    }
}
