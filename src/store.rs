//! # Target Store
//!
//! The storage contract consumed by the engine, and its SeaORM implementation.
//! The engine keeps no state between cycles beyond what goes through this trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::alerting::AlertKind;
use crate::checker::CheckOutcome;
use crate::error::StoreError;
use crate::feeds::ParsedArticle;
use crate::models::uptime_check;
use crate::repositories::{
    AlertHistoryRepository, ArticleRepository, FeedRepository, UptimeCheckRepository,
    WebsiteRepository,
};
use crate::targets::{Target, TargetKey, TargetKind};

/// Article ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub feed_id: i32,
    pub guid: String,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewArticle {
    pub fn from_parsed(feed_id: i32, guid: &str, parsed: &ParsedArticle) -> Self {
        fn non_empty(value: &str) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        Self {
            feed_id,
            guid: guid.to_string(),
            title: parsed.title.trim().to_string(),
            link: parsed.link.trim().to_string(),
            description: non_empty(&parsed.description),
            content: non_empty(&parsed.content),
            author: non_empty(&parsed.author),
            published_at: parsed.published_at,
        }
    }
}

/// Feed metadata discovered from the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMetadata {
    pub title: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
}

#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Active websites and enabled feeds, read fresh on every call.
    async fn list_active_targets(&self) -> Result<Vec<Target>, StoreError>;

    async fn find_target(&self, key: TargetKey) -> Result<Option<Target>, StoreError>;

    async fn last_observation(
        &self,
        website_id: i32,
    ) -> Result<Option<uptime_check::Model>, StoreError>;

    /// Appends a check result and advances the website's last-checked time.
    async fn append_observation(
        &self,
        website_id: i32,
        outcome: &CheckOutcome,
    ) -> Result<uptime_check::Model, StoreError>;

    async fn article_exists(&self, feed_id: i32, guid: &str) -> Result<bool, StoreError>;

    /// Returns `false` when the article was already present.
    async fn append_article(&self, article: NewArticle) -> Result<bool, StoreError>;

    async fn update_feed_metadata(
        &self,
        feed_id: i32,
        metadata: &FeedMetadata,
    ) -> Result<(), StoreError>;

    async fn mark_feed_fetched(&self, feed_id: i32, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// True when no alert of `kind` was sent for the website within `cooldown`.
    async fn should_alert(
        &self,
        website_id: i32,
        kind: AlertKind,
        cooldown: Duration,
    ) -> Result<bool, StoreError>;

    async fn record_alert_sent(&self, website_id: i32, kind: AlertKind) -> Result<(), StoreError>;
}

/// Decides whether the last alert is old enough for a new one to go out.
pub fn cooldown_elapsed(last_sent: DateTime<Utc>, now: DateTime<Utc>, cooldown: Duration) -> bool {
    match chrono::Duration::from_std(cooldown) {
        Ok(window) => now - last_sent >= window,
        Err(_) => false,
    }
}

/// [`TargetStore`] backed by the SeaORM repositories.
#[derive(Debug, Clone)]
pub struct DbTargetStore {
    websites: WebsiteRepository,
    checks: UptimeCheckRepository,
    alerts: AlertHistoryRepository,
    feeds: FeedRepository,
    articles: ArticleRepository,
}

impl DbTargetStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            websites: WebsiteRepository::new(db.clone()),
            checks: UptimeCheckRepository::new(db.clone()),
            alerts: AlertHistoryRepository::new(db.clone()),
            feeds: FeedRepository::new(db.clone()),
            articles: ArticleRepository::new(db),
        }
    }
}

#[async_trait]
impl TargetStore for DbTargetStore {
    async fn list_active_targets(&self) -> Result<Vec<Target>, StoreError> {
        let mut targets: Vec<Target> = self
            .websites
            .list_active()
            .await?
            .into_iter()
            .map(Target::Website)
            .collect();
        targets.extend(
            self.feeds
                .list_enabled()
                .await?
                .into_iter()
                .map(Target::Feed),
        );
        Ok(targets)
    }

    async fn find_target(&self, key: TargetKey) -> Result<Option<Target>, StoreError> {
        let target = match key.kind {
            TargetKind::Website => self.websites.find_by_id(key.id).await?.map(Target::Website),
            TargetKind::Feed => self.feeds.find_by_id(key.id).await?.map(Target::Feed),
        };
        Ok(target)
    }

    async fn last_observation(
        &self,
        website_id: i32,
    ) -> Result<Option<uptime_check::Model>, StoreError> {
        self.checks.latest(website_id).await
    }

    async fn append_observation(
        &self,
        website_id: i32,
        outcome: &CheckOutcome,
    ) -> Result<uptime_check::Model, StoreError> {
        let now = Utc::now();
        let check = self.checks.insert(website_id, outcome, now).await?;
        self.websites.touch_checked(website_id, now).await?;
        Ok(check)
    }

    async fn article_exists(&self, feed_id: i32, guid: &str) -> Result<bool, StoreError> {
        self.articles.exists(feed_id, guid).await
    }

    async fn append_article(&self, article: NewArticle) -> Result<bool, StoreError> {
        self.articles.insert(article).await
    }

    async fn update_feed_metadata(
        &self,
        feed_id: i32,
        metadata: &FeedMetadata,
    ) -> Result<(), StoreError> {
        self.feeds.update_metadata(feed_id, metadata).await
    }

    async fn mark_feed_fetched(&self, feed_id: i32, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.feeds.mark_fetched(feed_id, at).await
    }

    async fn should_alert(
        &self,
        website_id: i32,
        kind: AlertKind,
        cooldown: Duration,
    ) -> Result<bool, StoreError> {
        let allowed = match self.alerts.latest(website_id, kind).await? {
            None => true,
            Some(record) => {
                cooldown_elapsed(record.sent_at.with_timezone(&Utc), Utc::now(), cooldown)
            }
        };
        Ok(allowed)
    }

    async fn record_alert_sent(&self, website_id: i32, kind: AlertKind) -> Result<(), StoreError> {
        self.alerts.insert(website_id, kind, Utc::now()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_window_boundaries() {
        let now = Utc::now();
        let hour = Duration::from_secs(3600);

        assert!(!cooldown_elapsed(now - chrono::Duration::minutes(59), now, hour));
        assert!(cooldown_elapsed(now - chrono::Duration::minutes(60), now, hour));
        assert!(cooldown_elapsed(now, now, Duration::ZERO));
    }

    #[test]
    fn new_article_trims_and_drops_empty_fields() {
        let parsed = ParsedArticle {
            title: "  Hello ".into(),
            link: "http://example.test/a".into(),
            description: "   ".into(),
            content: "<p>x</p>".into(),
            author: String::new(),
            guid: "g-1".into(),
            published_at: None,
        };

        let article = NewArticle::from_parsed(4, "g-1", &parsed);
        assert_eq!(article.title, "Hello");
        assert_eq!(article.description, None);
        assert_eq!(article.content.as_deref(), Some("<p>x</p>"));
        assert_eq!(article.author, None);
        assert_eq!(article.feed_id, 4);
    }
}
