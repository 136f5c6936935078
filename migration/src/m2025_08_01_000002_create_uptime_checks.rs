//! Migration to create the uptime_checks table.
//!
//! One row per probe of a website. Rows are append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UptimeChecks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UptimeChecks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UptimeChecks::WebsiteId).integer().not_null())
                    .col(ColumnDef::new(UptimeChecks::Status).text().not_null())
                    .col(
                        ColumnDef::new(UptimeChecks::ResponseTimeMs)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UptimeChecks::StatusCode)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UptimeChecks::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(UptimeChecks::CheckedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_uptime_checks_website_id")
                            .from(UptimeChecks::Table, UptimeChecks::WebsiteId)
                            .to(Websites::Table, Websites::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Latest-observation lookups and stats windows
        manager
            .create_index(
                Index::create()
                    .name("idx_uptime_checks_website_checked_at")
                    .table(UptimeChecks::Table)
                    .col(UptimeChecks::WebsiteId)
                    .col(UptimeChecks::CheckedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_uptime_checks_website_checked_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(UptimeChecks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UptimeChecks {
    Table,
    Id,
    WebsiteId,
    Status,
    ResponseTimeMs,
    StatusCode,
    ErrorMessage,
    CheckedAt,
}

#[derive(DeriveIden)]
enum Websites {
    Table,
    Id,
}
