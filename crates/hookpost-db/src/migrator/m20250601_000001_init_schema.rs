//! Consolidated initial schema migration

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. Create endpoints table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Endpoint::Table)
                    .if_not_exists()
                    .col(big_integer(Endpoint::Id).auto_increment().primary_key())
                    .col(string_len(Endpoint::Name, 255).not_null().unique_key())
                    .col(string_len_null(Endpoint::Tenant, 255))
                    .col(string_len(Endpoint::Plan, 32).not_null())
                    .col(
                        timestamp_with_time_zone(Endpoint::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(Endpoint::ExpiresAt))
                    .col(boolean(Endpoint::IsDeleted).not_null().default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_endpoints_tenant")
                    .table(Endpoint::Table)
                    .col(Endpoint::Tenant)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. Create captured_requests table
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(CapturedRequest::Table)
                    .if_not_exists()
                    .col(
                        big_integer(CapturedRequest::Id)
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        string_len(CapturedRequest::Token, 64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(big_integer(CapturedRequest::EndpointId).not_null())
                    .col(string_len(CapturedRequest::Method, 16).not_null())
                    .col(string(CapturedRequest::Path).not_null())
                    .col(string_len(CapturedRequest::SourceIp, 64).not_null())
                    .col(string(CapturedRequest::ContentType).not_null())
                    .col(text(CapturedRequest::Content).not_null())
                    .col(integer(CapturedRequest::ContentSize).not_null())
                    .col(integer(CapturedRequest::ResponseCode).not_null())
                    .col(text(CapturedRequest::Headers).not_null())
                    .col(text(CapturedRequest::Query).not_null())
                    .col(text_null(CapturedRequest::FormData))
                    .col(timestamp_with_time_zone(CapturedRequest::CreatedAt).not_null())
                    .col(timestamp_with_time_zone_null(CapturedRequest::ExpiresAt))
                    .col(
                        boolean(CapturedRequest::IsDeleted)
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_captured_requests_endpoint_id")
                            .from(CapturedRequest::Table, CapturedRequest::EndpointId)
                            .to(Endpoint::Table, Endpoint::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_captured_requests_endpoint_id")
                    .table(CapturedRequest::Table)
                    .col(CapturedRequest::EndpointId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_captured_requests_created_at")
                    .table(CapturedRequest::Table)
                    .col(CapturedRequest::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_captured_requests_expires_at")
                    .table(CapturedRequest::Table)
                    .col(CapturedRequest::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order (respecting foreign keys)
        manager
            .drop_table(Table::drop().table(CapturedRequest::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Endpoint::Table).to_owned())
            .await?;

        Ok(())
    }
}

// ============================================================
// Table identifiers
// ============================================================

#[derive(DeriveIden)]
enum Endpoint {
    #[sea_orm(iden = "endpoints")]
    Table,
    Id,
    Name,
    Tenant,
    Plan,
    CreatedAt,
    ExpiresAt,
    IsDeleted,
}

#[derive(DeriveIden)]
enum CapturedRequest {
    #[sea_orm(iden = "captured_requests")]
    Table,
    Id,
    Token,
    EndpointId,
    Method,
    Path,
    SourceIp,
    ContentType,
    Content,
    ContentSize,
    ResponseCode,
    Headers,
    Query,
    FormData,
    CreatedAt,
    ExpiresAt,
    IsDeleted,
}
