use ark::app;
use ark::config::{AppConfig, WebsiteSeed};
use ark::error::SchedulerError;
use ark::repositories::{FeedRepository, WebsiteRepository};
use ark::targets::TargetKey;

fn in_memory_config() -> AppConfig {
    let mut config = AppConfig {
        database_url: "sqlite::memory:".into(),
        db_max_connections: 1,
        ..AppConfig::default()
    };
    config.uptime.seed_websites = vec![WebsiteSeed {
        name: "Example".into(),
        url: "https://example.test".into(),
    }];
    config.feeds.seed_feeds = vec!["https://news.example.test/rss".into()];
    config
}

#[tokio::test]
async fn bootstrap_migrates_and_seeds() {
    let app = app::bootstrap(in_memory_config()).await.unwrap();

    let sites = WebsiteRepository::new(app.db.clone()).list_active().await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].name, "Example");
    assert_eq!(sites[0].check_interval, 300);

    let feeds = FeedRepository::new(app.db.clone()).list_enabled().await.unwrap();
    assert_eq!(feeds.len(), 1);
    assert_eq!(feeds[0].fetch_interval, 3600);

    assert!(!app.scheduler.is_running().await);
    assert!(app::build_alert_sender(&app.config).unwrap().is_none());
}

#[tokio::test]
async fn disabled_processors_are_not_wired() {
    let mut config = in_memory_config();
    config.scheduler.enable_rss = false;
    let app = app::bootstrap(config).await.unwrap();

    let feeds = FeedRepository::new(app.db.clone()).list_enabled().await.unwrap();
    let result = app.scheduler.refresh_one(TargetKey::feed(feeds[0].id)).await;

    assert!(matches!(result, Err(SchedulerError::KindDisabled(_))));
}

#[test]
fn alert_sender_requires_recipient_and_key() {
    let mut config = AppConfig::default();
    config.alerts.recipient = Some("ops@example.test".into());
    assert!(app::build_alert_sender(&config).unwrap().is_none());

    config.mailer.api_key = Some("api-key".into());
    assert!(app::build_alert_sender(&config).unwrap().is_some());
}
