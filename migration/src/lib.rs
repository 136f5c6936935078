//! Database migrations for The Ark.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_08_01_000001_create_websites;
mod m2025_08_01_000002_create_uptime_checks;
mod m2025_08_01_000003_create_alert_history;
mod m2025_08_01_000004_create_rss_feeds;
mod m2025_08_01_000005_create_rss_articles;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_08_01_000001_create_websites::Migration),
            Box::new(m2025_08_01_000002_create_uptime_checks::Migration),
            Box::new(m2025_08_01_000003_create_alert_history::Migration),
            Box::new(m2025_08_01_000004_create_rss_feeds::Migration),
            Box::new(m2025_08_01_000005_create_rss_articles::Migration),
        ]
    }
}
