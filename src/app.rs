//! # Application Wiring
//!
//! Builds the store, processors and scheduler from an [`AppConfig`] and runs
//! the scheduler until the process is asked to stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use tracing::{info, warn};

use crate::alerting::{AlertDeduplicator, AlertPolicy};
use crate::checker::HttpChecker;
use crate::config::AppConfig;
use crate::db;
use crate::feeds::HttpFeedFetcher;
use crate::ingest::FeedIngestor;
use crate::monitor::UptimeMonitor;
use crate::notifier::{AlertSender, Smtp2GoMailer};
use crate::scheduler::{Processors, Scheduler, SchedulerSettings};
use crate::seeds;
use crate::store::{DbTargetStore, TargetStore};

const UPTIME_USER_AGENT: &str = concat!("The Ark Uptime Monitor/", env!("CARGO_PKG_VERSION"));

/// Shared resources for every CLI command.
pub struct App {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub scheduler: Scheduler,
}

/// Connects, migrates, seeds and assembles the scheduler.
pub async fn bootstrap(config: AppConfig) -> Result<App> {
    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    seeds::seed_websites(
        &db,
        &config.uptime.seed_websites,
        config.uptime.check_interval_seconds,
    )
    .await
    .context("seeding websites")?;
    seeds::seed_feeds(
        &db,
        &config.feeds.seed_feeds,
        config.feeds.fetch_interval_seconds,
    )
    .await
    .context("seeding feeds")?;

    let store: Arc<dyn TargetStore> = Arc::new(DbTargetStore::new(db.clone()));
    let scheduler = build_scheduler(&config, store)?;

    Ok(App {
        config,
        db,
        scheduler,
    })
}

/// Returns the configured alert sender, or `None` when alerts cannot be delivered.
pub fn build_alert_sender(config: &AppConfig) -> Result<Option<Arc<dyn AlertSender>>> {
    if !config.alerts_deliverable() {
        if config.alerts.recipient.is_some() {
            warn!("alert recipient set but ARK_SMTP2GO_API_KEY is missing, alerts will only be logged");
        } else {
            info!("no alert recipient configured, alerts will only be logged");
        }
        return Ok(None);
    }
    let Some(recipient) = config.alerts.recipient.as_deref() else {
        return Ok(None);
    };

    let mailer = Smtp2GoMailer::new(&config.mailer, recipient).context("building mailer")?;
    Ok(Some(Arc::new(mailer)))
}

/// Builds the scheduler with the processors enabled in `config`.
pub fn build_scheduler(config: &AppConfig, store: Arc<dyn TargetStore>) -> Result<Scheduler> {
    let mut processors = Processors::default();

    if config.scheduler.enable_uptime {
        let checker = HttpChecker::new(
            Duration::from_secs(config.uptime.check_timeout_seconds),
            UPTIME_USER_AGENT,
        )
        .context("building website checker")?;
        let alerts = AlertDeduplicator::new(
            Arc::clone(&store),
            build_alert_sender(config)?,
            AlertPolicy::from(&config.alerts),
        );
        processors.uptime = Some(UptimeMonitor::new(
            Arc::clone(&store),
            Arc::new(checker),
            alerts,
        ));
    }

    if config.scheduler.enable_rss {
        let fetcher = HttpFeedFetcher::new(
            Duration::from_secs(config.feeds.fetch_timeout_seconds),
            &config.feeds.user_agent,
        )
        .context("building feed fetcher")?;
        processors.feeds = Some(FeedIngestor::new(Arc::clone(&store), Arc::new(fetcher)));
    }

    Ok(Scheduler::new(
        store,
        SchedulerSettings::from(&config.scheduler),
        processors,
    ))
}

/// Starts the scheduler and blocks until Ctrl-C, then drains in-flight work.
pub async fn run_until_shutdown(app: &App) -> Result<()> {
    app.scheduler.start().await?;
    info!(
        profile = %app.config.profile,
        uptime = app.config.scheduler.enable_uptime,
        rss = app.config.scheduler.enable_rss,
        "The Ark is running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("listening for shutdown signal")?;
    info!("shutdown signal received, draining in-flight checks");

    app.scheduler.stop().await?;
    Ok(())
}
