//! Endpoint entity: one claimed public subdomain

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "endpoints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Subdomain name, stored lowercase, unique among live rows
    #[sea_orm(unique)]
    pub name: String,

    /// Owning tenant; None for guest endpoints
    pub tenant: Option<String>,

    /// Plan tier at provisioning time: "guest", "free" or "pro"
    pub plan: String,

    pub created_at: ChronoDateTimeUtc,

    /// None means the endpoint never expires
    pub expires_at: Option<ChronoDateTimeUtc>,

    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::captured_request::Entity")]
    CapturedRequest,
}

impl Related<super::captured_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CapturedRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
