//! Feed seeding functionality

use anyhow::Result;
use sea_orm::DatabaseConnection;

use super::SeedReport;
use crate::repositories::FeedRepository;

/// Seeds the rss_feeds table from configuration
///
/// New feeds start without a title; it is filled in on the first fetch.
pub async fn seed_feeds(
    db: &DatabaseConnection,
    urls: &[String],
    fetch_interval: u64,
) -> Result<SeedReport> {
    let repo = FeedRepository::new(db.clone());
    let interval = i32::try_from(fetch_interval)?;
    let mut report = SeedReport::default();

    for url in urls {
        if repo.find_by_url(url).await?.is_some() {
            log::info!("Feed '{}' already exists, skipping", url);
            report.existing += 1;
            continue;
        }

        log::info!("Creating feed: {}", url);
        repo.create(url, interval).await.map_err(|e| {
            log::error!("Failed to create feed '{}': {}", url, e);
            e
        })?;
        report.created += 1;
    }

    log::info!(
        "Feed seeding completed: {} created, {} existing",
        report.created,
        report.existing
    );
    Ok(report)
}
