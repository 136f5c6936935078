//! Migration to create the alert_history table used for cooldown lookups.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlertHistory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AlertHistory::WebsiteId).integer().not_null())
                    .col(ColumnDef::new(AlertHistory::AlertType).text().not_null())
                    .col(
                        ColumnDef::new(AlertHistory::SentAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alert_history_website_id")
                            .from(AlertHistory::Table, AlertHistory::WebsiteId)
                            .to(Websites::Table, Websites::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alert_history_website_type")
                    .table(AlertHistory::Table)
                    .col(AlertHistory::WebsiteId)
                    .col(AlertHistory::AlertType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_alert_history_website_type")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(AlertHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AlertHistory {
    Table,
    Id,
    WebsiteId,
    AlertType,
    SentAt,
}

#[derive(DeriveIden)]
enum Websites {
    Table,
    Id,
}
