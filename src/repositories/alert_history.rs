//! # AlertHistory Repository
//!
//! Records sent alerts and answers "when was the last alert of this kind".

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::alerting::AlertKind;
use crate::error::StoreError;
use crate::models::alert_history::{self, Column, Entity as AlertHistory};

#[derive(Debug, Clone)]
pub struct AlertHistoryRepository {
    db: DatabaseConnection,
}

impl AlertHistoryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Most recent alert of `kind` sent for the website
    pub async fn latest(
        &self,
        website_id: i32,
        kind: AlertKind,
    ) -> Result<Option<alert_history::Model>, StoreError> {
        let record = AlertHistory::find()
            .filter(Column::WebsiteId.eq(website_id))
            .filter(Column::AlertType.eq(kind.as_str()))
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await?;
        Ok(record)
    }

    pub async fn insert(
        &self,
        website_id: i32,
        kind: AlertKind,
        sent_at: DateTime<Utc>,
    ) -> Result<alert_history::Model, StoreError> {
        let record = alert_history::ActiveModel {
            website_id: Set(website_id),
            alert_type: Set(kind.as_str().to_string()),
            sent_at: Set(sent_at.fixed_offset()),
            ..Default::default()
        };
        Ok(record.insert(&self.db).await?)
    }
}
