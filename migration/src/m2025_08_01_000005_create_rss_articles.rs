//! Migration to create the rss_articles table.
//!
//! The unique (feed_id, guid) index is what makes ingestion idempotent.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RssArticles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RssArticles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RssArticles::FeedId).integer().not_null())
                    .col(ColumnDef::new(RssArticles::Guid).text().not_null())
                    .col(
                        ColumnDef::new(RssArticles::Title)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(RssArticles::Link)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(RssArticles::Description).text().null())
                    .col(ColumnDef::new(RssArticles::Content).text().null())
                    .col(ColumnDef::new(RssArticles::Author).text().null())
                    .col(
                        ColumnDef::new(RssArticles::PublishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RssArticles::FetchedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RssArticles::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(RssArticles::IsStarred)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rss_articles_feed_id")
                            .from(RssArticles::Table, RssArticles::FeedId)
                            .to(RssFeeds::Table, RssFeeds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rss_articles_feed_guid")
                    .table(RssArticles::Table)
                    .col(RssArticles::FeedId)
                    .col(RssArticles::Guid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rss_articles_published_at")
                    .table(RssArticles::Table)
                    .col(RssArticles::PublishedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_rss_articles_published_at").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_rss_articles_feed_guid").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RssArticles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum RssArticles {
    Table,
    Id,
    FeedId,
    Guid,
    Title,
    Link,
    Description,
    Content,
    Author,
    PublishedAt,
    FetchedAt,
    IsRead,
    IsStarred,
}

#[derive(DeriveIden)]
enum RssFeeds {
    Table,
    Id,
}
