//! Normalized hook request types
//!
//! The inbound transport hands the core a [`RawHook`]: an already-parsed
//! view of one HTTP request with ordered multimaps for headers, query and
//! form fields. The core never touches sockets or framework request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HookError;
use hookpost_db::entities::captured_request;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM: &str = "multipart/form-data";

/// Closed HTTP method enumeration, stored lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Trace => "trace",
            HttpMethod::Connect => "connect",
        }
    }

    /// Normalize a wire-format method name, case-insensitively
    pub fn parse(value: &str) -> Option<HttpMethod> {
        match value.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            "trace" => Some(HttpMethod::Trace),
            "connect" => Some(HttpMethod::Connect),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound request, normalized by the transport layer
#[derive(Debug, Clone)]
pub struct RawHook {
    pub method: HttpMethod,
    pub path: String,
    pub source_ip: String,
    pub content_type: String,
    pub content: String,
    /// Ordered header multimap
    pub headers: Vec<(String, String)>,
    /// Ordered query multimap
    pub query: Vec<(String, String)>,
    /// Form fields, only for form content types
    pub form_data: Option<Vec<(String, String)>>,
}

impl RawHook {
    pub fn is_form(&self) -> bool {
        self.content_type.contains(FORM_URLENCODED) || self.content_type.contains(MULTIPART_FORM)
    }
}

/// One persisted hook, as returned to callers and broadcast to inspectors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapturedHook {
    pub id: i64,
    /// Shareable correlation token
    pub token: String,
    pub endpoint: String,
    pub method: HttpMethod,
    pub path: String,
    pub source_ip: String,
    pub content_type: String,
    pub content: String,
    pub content_size: i32,
    pub response_code: u16,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Vec<(String, String)>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CapturedHook {
    /// Rehydrate a stored row, deserializing the multimap columns
    pub fn from_model(
        endpoint_name: &str,
        model: captured_request::Model,
    ) -> Result<Self, HookError> {
        let headers: Vec<(String, String)> = serde_json::from_str(&model.headers)?;
        let query: Vec<(String, String)> = serde_json::from_str(&model.query)?;
        let form_data = model
            .form_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        let method = HttpMethod::parse(&model.method)
            .ok_or_else(|| HookError::Internal(format!("stored method '{}'", model.method)))?;

        Ok(Self {
            id: model.id,
            token: model.token,
            endpoint: endpoint_name.to_string(),
            method,
            path: model.path,
            source_ip: model.source_ip,
            content_type: model.content_type,
            content: model.content,
            content_size: model.content_size,
            response_code: model.response_code as u16,
            headers,
            query,
            form_data,
            created_at: model.created_at,
            expires_at: model.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("POST"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("Delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("BREW"), None);
    }

    #[test]
    fn test_method_serializes_lowercase() {
        let json = serde_json::to_string(&HttpMethod::Patch).unwrap();
        assert_eq!(json, r#""patch""#);
    }

    #[test]
    fn test_form_detection() {
        let mut hook = RawHook {
            method: HttpMethod::Post,
            path: "/".to_string(),
            source_ip: "127.0.0.1".to_string(),
            content_type: "multipart/form-data; boundary=xyz".to_string(),
            content: String::new(),
            headers: vec![],
            query: vec![],
            form_data: None,
        };
        assert!(hook.is_form());

        hook.content_type = "application/json".to_string();
        assert!(!hook.is_form());
    }
}
