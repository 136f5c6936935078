//! # Scheduler
//!
//! Drives update cycles over every active target. A cycle lists targets fresh
//! from the store, drops the ones whose interval has not elapsed, and fans the
//! rest out to a bounded [`WorkerPool`]. One failing target never aborts the
//! cycle.
//!
//! Checks of the same target are serialized: scheduled cycles skip a target
//! that is already being processed, manual refreshes wait for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use metrics::histogram;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{ProcessError, SchedulerError};
use crate::ingest::{FeedIngestor, IngestReport};
use crate::monitor::{MonitorOutcome, UptimeMonitor};
use crate::store::TargetStore;
use crate::targets::{Target, TargetKey, TargetKind};
use crate::worker_pool::WorkerPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub tick_interval: Duration,
    pub max_workers: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            max_workers: 5,
        }
    }
}

impl From<&SchedulerConfig> for SchedulerSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            tick_interval: Duration::from_secs(config.tick_interval_seconds),
            max_workers: config.max_concurrent_fetches,
        }
    }
}

/// What started a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    Tick,
    Manual,
}

impl CycleTrigger {
    fn as_str(&self) -> &'static str {
        match self {
            CycleTrigger::Tick => "tick",
            CycleTrigger::Manual => "manual",
        }
    }

    /// Manual cycles ignore per-target intervals and wait for busy targets.
    fn is_manual(&self) -> bool {
        matches!(self, CycleTrigger::Manual)
    }
}

/// Result of processing a single target.
#[derive(Debug, Clone)]
pub enum TargetOutcome {
    Checked(MonitorOutcome),
    Ingested(IngestReport),
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub listed: usize,
    pub dispatched: usize,
    pub skipped_not_due: usize,
    pub skipped_busy: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub duration: Duration,
}

enum TaskResult {
    Done,
    Busy,
    Failed,
    Cancelled,
}

enum State {
    Idle,
    Running {
        handle: JoinHandle<()>,
    },
    Stopped,
}

/// Per-target single-flight locks. An entry lives only while some task holds
/// or waits for it.
#[derive(Default)]
struct TargetLocks {
    locks: StdMutex<HashMap<TargetKey, Arc<Mutex<()>>>>,
}

impl TargetLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<TargetKey, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, key: TargetKey) -> Arc<Mutex<()>> {
        Arc::clone(self.map().entry(key).or_default())
    }

    async fn acquire(&self, key: TargetKey) -> TargetGuard<'_> {
        let guard = self.entry(key).lock_owned().await;
        TargetGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    fn try_acquire(&self, key: TargetKey) -> Option<TargetGuard<'_>> {
        let guard = self.entry(key).try_lock_owned().ok()?;
        Some(TargetGuard {
            locks: self,
            key,
            guard: Some(guard),
        })
    }

    fn prune(&self, key: TargetKey) {
        let mut locks = self.map();
        if locks
            .get(&key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Held while a target is processed; releases the lock and drops the idle entry.
struct TargetGuard<'a> {
    locks: &'a TargetLocks,
    key: TargetKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.prune(self.key);
    }
}

struct Engine {
    store: Arc<dyn TargetStore>,
    uptime: Option<Arc<UptimeMonitor>>,
    feeds: Option<Arc<FeedIngestor>>,
    pool: WorkerPool,
    locks: TargetLocks,
}

impl Engine {
    fn handles(&self, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Website => self.uptime.is_some(),
            TargetKind::Feed => self.feeds.is_some(),
        }
    }

    async fn process(
        &self,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<TargetOutcome, ProcessError> {
        match (target, &self.uptime, &self.feeds) {
            (Target::Website(site), Some(monitor), _) => monitor
                .process(site, cancel)
                .await
                .map(TargetOutcome::Checked),
            (Target::Feed(feed), _, Some(ingestor)) => ingestor
                .process(feed, cancel)
                .await
                .map(TargetOutcome::Ingested),
            _ => Err(ProcessError::Disabled(target.kind())),
        }
    }

    async fn run_task(
        &self,
        target: Target,
        trigger: CycleTrigger,
        cancel: &CancellationToken,
    ) -> TaskResult {
        let key = target.key();
        let _guard = if trigger.is_manual() {
            self.locks.acquire(key).await
        } else {
            match self.locks.try_acquire(key) {
                Some(guard) => guard,
                None => {
                    debug!(key = %key, "target already in flight, skipping");
                    return TaskResult::Busy;
                }
            }
        };

        match self.process(&target, cancel).await {
            Ok(_) => TaskResult::Done,
            Err(ProcessError::Cancelled) => {
                debug!(key = %key, "target processing cancelled");
                TaskResult::Cancelled
            }
            Err(err) => {
                error!(
                    key = %key,
                    url = %target.url(),
                    error = ?err,
                    "target processing failed"
                );
                TaskResult::Failed
            }
        }
    }

    async fn cycle(
        self: &Arc<Self>,
        trigger: CycleTrigger,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, SchedulerError> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", cycle_id = %cycle_id, trigger = trigger.as_str());
        self.cycle_inner(cycle_id, trigger, cancel)
            .instrument(span)
            .await
    }

    async fn cycle_inner(
        self: &Arc<Self>,
        cycle_id: Uuid,
        trigger: CycleTrigger,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, SchedulerError> {
        let started = Instant::now();
        let now = Utc::now();
        let mut report = CycleReport {
            cycle_id,
            ..CycleReport::default()
        };

        let targets = self.store.list_active_targets().await?;
        report.listed = targets.len();

        let due: Vec<Target> = targets
            .into_iter()
            .filter(|target| self.handles(target.kind()))
            .filter(|target| {
                let due = trigger.is_manual() || target.is_due(now);
                if !due {
                    report.skipped_not_due += 1;
                }
                due
            })
            .collect();
        report.dispatched = due.len();

        let engine = Arc::clone(self);
        let cancel = cancel.clone();
        let results = self
            .pool
            .run(due, move |target| {
                let engine = Arc::clone(&engine);
                let cancel = cancel.clone();
                async move { engine.run_task(target, trigger, &cancel).await }
            })
            .await;

        for result in results {
            match result {
                TaskResult::Done => report.succeeded += 1,
                TaskResult::Busy => report.skipped_busy += 1,
                TaskResult::Failed => report.failed += 1,
                TaskResult::Cancelled => report.cancelled += 1,
            }
        }

        report.duration = started.elapsed();
        histogram!("ark_cycle_duration_ms").record(report.duration.as_secs_f64() * 1_000.0);
        info!(
            listed = report.listed,
            dispatched = report.dispatched,
            skipped_not_due = report.skipped_not_due,
            skipped_busy = report.skipped_busy,
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            duration_ms = report.duration.as_millis() as u64,
            "cycle completed"
        );
        Ok(report)
    }

    async fn run_loop(self: Arc<Self>, tick_interval: Duration, cancel: CancellationToken) {
        info!(tick_seconds = tick_interval.as_secs(), "starting scheduler");

        if let Err(err) = self.cycle(CycleTrigger::Tick, &cancel).await {
            error!(error = ?err, "initial cycle failed");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    if let Err(err) = self.cycle(CycleTrigger::Tick, &cancel).await {
                        error!(error = ?err, "scheduled cycle failed");
                    }
                }
            }
        }

        info!("scheduler stopped");
    }
}

/// Per-kind processors. A `None` kind is never listed for processing.
#[derive(Default)]
pub struct Processors {
    pub uptime: Option<UptimeMonitor>,
    pub feeds: Option<FeedIngestor>,
}

/// Periodic and on-demand driver for the uptime monitor and feed ingestor.
pub struct Scheduler {
    engine: Arc<Engine>,
    settings: SchedulerSettings,
    cancel: CancellationToken,
    refreshes: TaskTracker,
    state: Mutex<State>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn TargetStore>,
        settings: SchedulerSettings,
        processors: Processors,
    ) -> Self {
        Self {
            engine: Arc::new(Engine {
                store,
                uptime: processors.uptime.map(Arc::new),
                feeds: processors.feeds.map(Arc::new),
                pool: WorkerPool::new(settings.max_workers),
                locks: TargetLocks::default(),
            }),
            settings,
            cancel: CancellationToken::new(),
            refreshes: TaskTracker::new(),
            state: Mutex::new(State::Idle),
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Spawns the background loop. The first cycle runs immediately, then one
    /// per tick interval. Returns without waiting for the first cycle.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        match *state {
            State::Running { .. } => return Err(SchedulerError::AlreadyRunning),
            State::Stopped => return Err(SchedulerError::Stopped),
            State::Idle => {}
        }

        let engine = Arc::clone(&self.engine);
        let loop_task = engine.run_loop(self.settings.tick_interval, self.cancel.clone());
        let handle = tokio::spawn(loop_task);
        *state = State::Running { handle };
        Ok(())
    }

    /// Cancels in-flight work and waits for the loop and any manual refreshes
    /// to return. The scheduler cannot be restarted afterwards.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, State::Stopped)
        };

        self.cancel.cancel();
        self.refreshes.close();

        let joined = match previous {
            State::Running { handle } => handle.await,
            State::Idle | State::Stopped => Ok(()),
        };
        self.refreshes.wait().await;

        if let Err(err) = &joined {
            warn!(error = ?err, "scheduler loop ended abnormally");
        }
        joined.map_err(SchedulerError::from)
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, State::Running { .. })
    }

    async fn ensure_not_stopped(&self) -> Result<(), SchedulerError> {
        if matches!(*self.state.lock().await, State::Stopped) {
            return Err(SchedulerError::Stopped);
        }
        Ok(())
    }

    /// Processes one target now, ignoring its interval.
    pub async fn refresh_one(&self, key: TargetKey) -> Result<TargetOutcome, SchedulerError> {
        self.ensure_not_stopped().await?;
        self.refreshes
            .track_future(self.refresh_one_inner(key))
            .await
    }

    async fn refresh_one_inner(&self, key: TargetKey) -> Result<TargetOutcome, SchedulerError> {
        let target = self
            .engine
            .store
            .find_target(key)
            .await?
            .filter(Target::is_active)
            .ok_or(SchedulerError::TargetNotFound(key))?;
        if !self.engine.handles(key.kind) {
            return Err(SchedulerError::KindDisabled(key));
        }

        let _guard = self.engine.locks.acquire(key).await;
        info!(key = %key, "manual refresh");
        self.engine
            .process(&target, &self.cancel)
            .await
            .map_err(|source| {
                error!(key = %key, error = ?source, "manual refresh failed");
                SchedulerError::Target { key, source }
            })
    }

    /// Runs a full cycle now over every active target.
    pub async fn refresh_all(&self) -> Result<CycleReport, SchedulerError> {
        self.ensure_not_stopped().await?;
        self.refreshes
            .track_future(self.engine.cycle(CycleTrigger::Manual, &self.cancel))
            .await
    }

    /// Runs one cycle with the same interval gating as the background loop.
    pub async fn run_cycle(&self) -> Result<CycleReport, SchedulerError> {
        self.ensure_not_stopped().await?;
        self.refreshes
            .track_future(self.engine.cycle(CycleTrigger::Tick, &self.cancel))
            .await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_trigger_bypasses_gating() {
        assert!(CycleTrigger::Manual.is_manual());
        assert!(!CycleTrigger::Tick.is_manual());
    }

    #[test]
    fn settings_from_config() {
        let config = SchedulerConfig {
            tick_interval_seconds: 45,
            max_concurrent_fetches: 7,
            ..SchedulerConfig::default()
        };
        let settings = SchedulerSettings::from(&config);
        assert_eq!(settings.tick_interval, Duration::from_secs(45));
        assert_eq!(settings.max_workers, 7);
    }

    #[tokio::test]
    async fn single_flight_lock_is_exclusive() {
        let locks = TargetLocks::default();
        let key = TargetKey::website(1);

        let held = locks.acquire(key).await;
        assert!(locks.try_acquire(key).is_none());
        assert!(locks.try_acquire(TargetKey::feed(1)).is_some());

        drop(held);
        assert!(locks.try_acquire(key).is_some());
    }

    #[tokio::test]
    async fn released_locks_leave_no_entries() {
        let locks = TargetLocks::default();
        for id in 0..10 {
            let guard = locks.acquire(TargetKey::feed(id)).await;
            assert_eq!(locks.len(), 1);
            drop(guard);
        }
        assert_eq!(locks.len(), 0);

        let held = locks.acquire(TargetKey::website(1)).await;
        assert!(locks.try_acquire(TargetKey::website(1)).is_none());
        assert_eq!(locks.len(), 1);
        drop(held);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn waiting_task_keeps_the_entry_alive() {
        let locks = Arc::new(TargetLocks::default());
        let key = TargetKey::website(5);
        let held = locks.acquire(key).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(key).await;
            })
        };
        while Arc::strong_count(&locks.entry(key)) < 4 {
            tokio::task::yield_now().await;
        }

        drop(held);
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
