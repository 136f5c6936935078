//! Website repository for database operations
//!
//! This module provides the WebsiteRepository struct which encapsulates
//! SeaORM operations for the websites table.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::error::StoreError;
use crate::models::website::{self, Column, Entity as Website};

/// Repository for website database operations
#[derive(Debug, Clone)]
pub struct WebsiteRepository {
    db: DatabaseConnection,
}

impl WebsiteRepository {
    /// Creates a new WebsiteRepository instance
    ///
    /// # Arguments
    ///
    /// * `db` - Database connection pool
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists websites that should be checked, oldest first
    pub async fn list_active(&self) -> Result<Vec<website::Model>, StoreError> {
        let sites = Website::find()
            .filter(Column::IsActive.eq(true))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(sites)
    }

    /// Finds a website by id regardless of its active flag
    pub async fn find_by_id(&self, id: i32) -> Result<Option<website::Model>, StoreError> {
        Ok(Website::find_by_id(id).one(&self.db).await?)
    }

    /// Finds a website by its unique URL
    pub async fn find_by_url(&self, url: &str) -> Result<Option<website::Model>, StoreError> {
        let site = Website::find()
            .filter(Column::Url.eq(url))
            .one(&self.db)
            .await?;
        Ok(site)
    }

    /// Creates an active website
    ///
    /// # Arguments
    ///
    /// * `name` - Display name used in alert emails
    /// * `url` - Address to check
    /// * `check_interval` - Seconds between checks
    ///
    /// # Returns
    ///
    /// Returns the inserted row
    pub async fn create(
        &self,
        name: &str,
        url: &str,
        check_interval: i32,
    ) -> Result<website::Model, StoreError> {
        let now = Utc::now().fixed_offset();
        let site = website::ActiveModel {
            name: Set(name.to_string()),
            url: Set(url.to_string()),
            check_interval: Set(check_interval),
            is_active: Set(true),
            last_checked_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(site.insert(&self.db).await?)
    }

    /// Soft-disables or re-enables a website
    pub async fn set_active(&self, id: i32, active: bool) -> Result<(), StoreError> {
        let site = website::ActiveModel {
            id: Set(id),
            is_active: Set(active),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };
        site.update(&self.db).await?;
        Ok(())
    }

    /// Records when the website was last checked
    pub async fn touch_checked(&self, id: i32, at: DateTime<Utc>) -> Result<(), StoreError> {
        let site = website::ActiveModel {
            id: Set(id),
            last_checked_at: Set(Some(at.fixed_offset())),
            ..Default::default()
        };
        site.update(&self.db).await?;
        Ok(())
    }
}
