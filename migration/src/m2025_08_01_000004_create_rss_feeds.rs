//! Migration to create the rss_feeds table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RssFeeds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RssFeeds::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RssFeeds::Url).text().not_null().unique_key())
                    .col(
                        ColumnDef::new(RssFeeds::Title)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::SiteUrl)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::FetchInterval)
                            .integer()
                            .not_null()
                            .default(3600),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::LastFetched)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RssFeeds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rss_feeds_enabled")
                    .table(RssFeeds::Table)
                    .col(RssFeeds::Enabled)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_rss_feeds_enabled").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RssFeeds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RssFeeds {
    Table,
    Id,
    Url,
    Title,
    Description,
    SiteUrl,
    FetchInterval,
    Enabled,
    LastFetched,
    CreatedAt,
    UpdatedAt,
}
