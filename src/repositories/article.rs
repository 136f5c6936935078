//! # Article Repository
//!
//! Insert-if-absent access to rss_articles. The (feed_id, guid) unique index
//! is the final arbiter: a losing concurrent insert reports "not inserted".

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::error::{StoreError, is_unique_violation};
use crate::models::article::{self, Column, Entity as Article};
use crate::store::NewArticle;

#[derive(Debug, Clone)]
pub struct ArticleRepository {
    db: DatabaseConnection,
}

impl ArticleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn exists(&self, feed_id: i32, guid: &str) -> Result<bool, StoreError> {
        let count = Article::find()
            .filter(Column::FeedId.eq(feed_id))
            .filter(Column::Guid.eq(guid))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Inserts the article, returning `false` if (feed_id, guid) already exists
    pub async fn insert(&self, new: NewArticle) -> Result<bool, StoreError> {
        let row = article::ActiveModel {
            feed_id: Set(new.feed_id),
            guid: Set(new.guid),
            title: Set(new.title),
            link: Set(new.link),
            description: Set(new.description),
            content: Set(new.content),
            author: Set(new.author),
            published_at: Set(new.published_at.map(|at| at.fixed_offset())),
            fetched_at: Set(Utc::now().fixed_offset()),
            is_read: Set(false),
            is_starred: Set(false),
            ..Default::default()
        };

        match row.insert(&self.db).await {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn count_for_feed(&self, feed_id: i32) -> Result<u64, StoreError> {
        let count = Article::find()
            .filter(Column::FeedId.eq(feed_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}
