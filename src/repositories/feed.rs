//! Feed repository for database operations
//!
//! This module provides the FeedRepository struct which encapsulates
//! SeaORM operations for the rss_feeds table.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::error::StoreError;
use crate::models::feed::{self, Column, Entity as Feed};
use crate::store::FeedMetadata;

/// Repository for feed database operations
#[derive(Debug, Clone)]
pub struct FeedRepository {
    db: DatabaseConnection,
}

impl FeedRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists enabled feeds
    pub async fn list_enabled(&self) -> Result<Vec<feed::Model>, StoreError> {
        let feeds = Feed::find()
            .filter(Column::Enabled.eq(true))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(feeds)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<feed::Model>, StoreError> {
        Ok(Feed::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<feed::Model>, StoreError> {
        let feed = Feed::find()
            .filter(Column::Url.eq(url))
            .one(&self.db)
            .await?;
        Ok(feed)
    }

    /// Creates an enabled feed with empty metadata; the title is discovered on first fetch
    ///
    /// # Arguments
    ///
    /// * `url` - Feed address
    /// * `fetch_interval` - Minimum seconds between fetches
    pub async fn create(&self, url: &str, fetch_interval: i32) -> Result<feed::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let feed = feed::ActiveModel {
            url: Set(url.to_string()),
            title: Set(String::new()),
            description: Set(String::new()),
            site_url: Set(String::new()),
            fetch_interval: Set(fetch_interval),
            enabled: Set(true),
            last_fetched: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(feed.insert(&self.db).await?)
    }

    /// Overwrites title, and description and site URL when present
    pub async fn update_metadata(
        &self,
        id: i32,
        metadata: &FeedMetadata,
    ) -> Result<(), StoreError> {
        let mut feed = feed::ActiveModel {
            id: Set(id),
            title: Set(metadata.title.clone()),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };
        if let Some(description) = &metadata.description {
            feed.description = Set(description.clone());
        }
        if let Some(site_url) = &metadata.site_url {
            feed.site_url = Set(site_url.clone());
        }
        feed.update(&self.db).await?;
        Ok(())
    }

    pub async fn mark_fetched(&self, id: i32, at: DateTime<Utc>) -> Result<(), StoreError> {
        let feed = feed::ActiveModel {
            id: Set(id),
            last_fetched: Set(Some(at.fixed_offset())),
            ..Default::default()
        };
        feed.update(&self.db).await?;
        Ok(())
    }
}
