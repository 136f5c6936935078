//! # Uptime Monitor
//!
//! Website binding of the engine: check, record, then let the de-duplicator
//! decide whether anyone hears about it.

use std::sync::Arc;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::alerting::{AlertDecision, AlertDeduplicator};
use crate::checker::Checker;
use crate::error::ProcessError;
use crate::models::{uptime_check, website};
use crate::store::TargetStore;

/// Result of processing one website.
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    pub check: uptime_check::Model,
    pub alert: AlertDecision,
}

pub struct UptimeMonitor {
    store: Arc<dyn TargetStore>,
    checker: Arc<dyn Checker>,
    alerts: AlertDeduplicator,
}

impl UptimeMonitor {
    pub fn new(
        store: Arc<dyn TargetStore>,
        checker: Arc<dyn Checker>,
        alerts: AlertDeduplicator,
    ) -> Self {
        Self {
            store,
            checker,
            alerts,
        }
    }

    /// Checks one website and records the observation.
    ///
    /// The prior observation is read before the new one is appended. If
    /// `cancel` fires while the request is in flight the request is dropped
    /// and nothing is written.
    #[instrument(skip_all, fields(website_id = site.id, url = %site.url))]
    pub async fn process(
        &self,
        site: &website::Model,
        cancel: &CancellationToken,
    ) -> Result<MonitorOutcome, ProcessError> {
        let prior = self.store.last_observation(site.id).await?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProcessError::Cancelled),
            outcome = self.checker.check(&site.url) => outcome,
        };

        let check = self.store.append_observation(site.id, &outcome).await?;
        counter!("ark_checks_total", "status" => check.status.clone()).increment(1);
        debug!(
            status = %check.status,
            status_code = check.status_code,
            latency_ms = check.response_time_ms,
            "recorded uptime check"
        );

        let alert = self.alerts.evaluate(site, prior.as_ref(), &check).await;
        Ok(MonitorOutcome { check, alert })
    }
}
