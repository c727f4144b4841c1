//! CapturedRequest entity: one normalized inbound HTTP request

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "captured_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Shareable correlation token (UUID), distinct from the row id
    #[sea_orm(unique)]
    pub token: String,

    pub endpoint_id: i64,

    /// Lowercase HTTP method ("get", "post", ...)
    pub method: String,

    pub path: String,
    pub source_ip: String,
    pub content_type: String,

    /// Raw body; empty when the plan ceiling truncated it
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Original body size in bytes, recorded even when content was truncated
    pub content_size: i32,

    /// Response code returned to the hook sender (200, or 413 on truncation)
    pub response_code: i32,

    /// JSON-encoded ordered multimap: Vec<(String, String)>
    #[sea_orm(column_type = "Text")]
    pub headers: String,

    /// JSON-encoded ordered multimap: Vec<(String, String)>
    #[sea_orm(column_type = "Text")]
    pub query: String,

    /// JSON-encoded form fields, present only for form content types
    #[sea_orm(column_type = "Text", nullable)]
    pub form_data: Option<String>,

    pub created_at: ChronoDateTimeUtc,

    /// None means the record is retained indefinitely
    pub expires_at: Option<ChronoDateTimeUtc>,

    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::endpoint::Entity",
        from = "Column::EndpointId",
        to = "super::endpoint::Column::Id"
    )]
    Endpoint,
}

impl Related<super::endpoint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Endpoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
