//! # UptimeCheck Repository
//!
//! Append-only access to the uptime_checks table.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::checker::CheckOutcome;
use crate::error::StoreError;
use crate::models::uptime_check::{self, Column, Entity as UptimeCheck, STATUS_DOWN, STATUS_UP};

#[derive(Debug, Clone)]
pub struct UptimeCheckRepository {
    db: DatabaseConnection,
}

impl UptimeCheckRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Most recently inserted check for a website
    pub async fn latest(&self, website_id: i32) -> Result<Option<uptime_check::Model>, StoreError> {
        let check = UptimeCheck::find()
            .filter(Column::WebsiteId.eq(website_id))
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await?;
        Ok(check)
    }

    pub async fn insert(
        &self,
        website_id: i32,
        outcome: &CheckOutcome,
        checked_at: DateTime<Utc>,
    ) -> Result<uptime_check::Model, StoreError> {
        let status = if outcome.up { STATUS_UP } else { STATUS_DOWN };
        let check = uptime_check::ActiveModel {
            website_id: Set(website_id),
            status: Set(status.to_string()),
            response_time_ms: Set(outcome.latency_ms),
            status_code: Set(i32::from(outcome.status_code)),
            error_message: Set(outcome.error.clone()),
            checked_at: Set(checked_at.fixed_offset()),
            ..Default::default()
        };
        Ok(check.insert(&self.db).await?)
    }

    /// Checks recorded at or after `since`, oldest first
    pub async fn since(
        &self,
        website_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<uptime_check::Model>, StoreError> {
        let checks = UptimeCheck::find()
            .filter(Column::WebsiteId.eq(website_id))
            .filter(Column::CheckedAt.gte(since.fixed_offset()))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(checks)
    }

    /// Latest checks for a website, newest first
    pub async fn history(
        &self,
        website_id: i32,
        limit: u64,
    ) -> Result<Vec<uptime_check::Model>, StoreError> {
        let checks = UptimeCheck::find()
            .filter(Column::WebsiteId.eq(website_id))
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(checks)
    }
}
