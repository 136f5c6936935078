//! Website seeding functionality

use anyhow::Result;
use sea_orm::DatabaseConnection;

use super::SeedReport;
use crate::config::WebsiteSeed;
use crate::repositories::WebsiteRepository;

/// Seeds the websites table from configuration
///
/// # Arguments
///
/// * `db` - Database connection
/// * `seeds` - Websites to ensure exist
/// * `check_interval` - Interval in seconds given to newly created websites
pub async fn seed_websites(
    db: &DatabaseConnection,
    seeds: &[WebsiteSeed],
    check_interval: u64,
) -> Result<SeedReport> {
    let repo = WebsiteRepository::new(db.clone());
    let interval = i32::try_from(check_interval)?;
    let mut report = SeedReport::default();

    for seed in seeds {
        match repo.find_by_url(&seed.url).await {
            Ok(Some(_)) => {
                log::info!("Website '{}' already exists, skipping", seed.url);
                report.existing += 1;
            }
            Ok(None) => {
                log::info!("Creating website: {} ({})", seed.name, seed.url);
                if let Err(e) = repo.create(&seed.name, &seed.url, interval).await {
                    log::error!("Failed to create website '{}': {}", seed.url, e);
                    return Err(e.into());
                }
                report.created += 1;
            }
            Err(e) => {
                log::error!("Error checking if website '{}' exists: {}", seed.url, e);
                return Err(e.into());
            }
        }
    }

    log::info!(
        "Website seeding completed: {} created, {} existing",
        report.created,
        report.existing
    );
    Ok(report)
}
