//! Test utilities for database-backed tests.
//!
//! Sets up an in-memory SQLite database with migrations applied plus a few
//! fakes for the engine's network seams.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use ark::checker::{CheckOutcome, Checker};
use ark::feeds::{FeedSource, FetchError, ParsedFeed};
use ark::models::{feed, website};
use ark::notifier::{AlertMessage, AlertSender, NotifyError};
use ark::repositories::{FeedRepository, WebsiteRepository};
use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// Each pooled connection to `sqlite::memory:` would open its own empty
/// database, so the pool is pinned to a single connection.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .idle_timeout(Duration::from_secs(3600))
        .sqlx_logging(false);
    let db = Database::connect(opt).await?;

    Migrator::up(&db, None).await?;

    Ok(db)
}

pub async fn insert_website(
    db: &DatabaseConnection,
    url: &str,
    check_interval: i32,
) -> Result<website::Model> {
    let site = WebsiteRepository::new(db.clone())
        .create("Test Site", url, check_interval)
        .await?;
    Ok(site)
}

pub async fn insert_feed(
    db: &DatabaseConnection,
    url: &str,
    fetch_interval: i32,
) -> Result<feed::Model> {
    let feed = FeedRepository::new(db.clone())
        .create(url, fetch_interval)
        .await?;
    Ok(feed)
}

pub fn up() -> CheckOutcome {
    CheckOutcome {
        up: true,
        status_code: 200,
        latency_ms: 15,
        error: None,
    }
}

pub fn down(status_code: u16) -> CheckOutcome {
    CheckOutcome {
        up: false,
        status_code,
        latency_ms: 15,
        error: None,
    }
}

/// Returns queued outcomes in order, then repeats the last one.
pub struct ScriptedChecker {
    script: Mutex<VecDeque<CheckOutcome>>,
    last: Mutex<CheckOutcome>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedChecker {
    pub fn new(script: Vec<CheckOutcome>) -> Self {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: Vec<CheckOutcome>, delay: Duration) -> Self {
        let last = script.last().cloned().unwrap_or_else(up);
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Keeps the in-flight count right even when the check future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Checker for ScriptedChecker {
    async fn check(&self, _url: &str) -> CheckOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => {
                *self.last.lock().unwrap() = outcome.clone();
                outcome
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

/// Records every alert instead of sending it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<AlertMessage>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSender for RecordingSender {
    async fn send_alert(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Fails the first `n` sends, then records like [`RecordingSender`].
pub struct FailingSender {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    delivered: RecordingSender,
}

impl FailingSender {
    pub fn failing_first(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            attempts: AtomicUsize::new(0),
            delivered: RecordingSender::default(),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<AlertMessage> {
        self.delivered.sent()
    }
}

#[async_trait]
impl AlertSender for FailingSender {
    async fn send_alert(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotifyError::Status { status: 500 });
        }
        self.delivered.send_alert(message).await
    }
}

/// Feed source whose every fetch fails.
pub struct FailingFeed;

#[async_trait]
impl FeedSource for FailingFeed {
    async fn fetch(&self, _url: &str) -> Result<ParsedFeed, FetchError> {
        Err(FetchError::Status { status: 503 })
    }
}
