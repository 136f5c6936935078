//! # The Ark
//!
//! Command line entry point: runs the scheduler or performs one-off checks.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ark::app::{self, App};
use ark::config::ConfigLoader;
use ark::repositories::UptimeCheckRepository;
use ark::scheduler::TargetOutcome;
use ark::stats;
use ark::targets::TargetKey;
use ark::{db, telemetry};

#[derive(Parser, Debug)]
#[command(author, version, about = "Website uptime monitor and feed fetcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl-C (default)
    Run,
    /// Apply database migrations and exit
    Migrate,
    /// Check one website now
    CheckWebsite { id: i32 },
    /// Fetch one feed now
    RefreshFeed { id: i32 },
    /// Process every active website and feed now
    RefreshAll,
    /// Print uptime statistics for a website
    Stats {
        website_id: i32,
        #[arg(
            long,
            default_value_t = 24,
            value_parser = clap::value_parser!(u32).range(1..=8760)
        )]
        hours: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load().context("loading configuration")?;
    telemetry::init_tracing(&config)?;
    tracing::debug!(config = %config.redacted_json()?, "configuration loaded");

    match cli.command.unwrap_or(Command::Run) {
        Command::Migrate => {
            let db = db::init_pool(&config).await?;
            db::run_migrations(&db).await?;
            println!("migrations applied");
        }
        Command::Run => {
            let app = app::bootstrap(config).await?;
            app::run_until_shutdown(&app).await?;
        }
        Command::CheckWebsite { id } => {
            let app = app::bootstrap(config).await?;
            refresh(&app, TargetKey::website(id)).await?;
        }
        Command::RefreshFeed { id } => {
            let app = app::bootstrap(config).await?;
            refresh(&app, TargetKey::feed(id)).await?;
        }
        Command::RefreshAll => {
            let app = app::bootstrap(config).await?;
            let report = app.scheduler.refresh_all().await?;
            println!(
                "processed {} targets: {} ok, {} failed",
                report.dispatched, report.succeeded, report.failed
            );
            app.scheduler.stop().await?;
        }
        Command::Stats { website_id, hours } => {
            let db = db::init_pool(&config).await?;
            db::run_migrations(&db).await?;
            let checks = UptimeCheckRepository::new(db);
            let summary = stats::uptime_summary(&checks, website_id, hours).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

async fn refresh(app: &App, key: TargetKey) -> Result<()> {
    match app.scheduler.refresh_one(key).await? {
        TargetOutcome::Checked(outcome) => println!(
            "{key}: {} (HTTP {}, {} ms)",
            outcome.check.status, outcome.check.status_code, outcome.check.response_time_ms
        ),
        TargetOutcome::Ingested(report) => println!(
            "{key}: {} new of {} articles",
            report.added, report.seen
        ),
    }
    app.scheduler.stop().await?;
    Ok(())
}
