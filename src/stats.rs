//! Uptime statistics over a recent window of checks.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::StoreError;
use crate::models::uptime_check;
use crate::repositories::UptimeCheckRepository;

/// A maximal run of consecutive `down` checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub started_at: DateTime<Utc>,
    /// Time of the first `up` check after the run, if there was one.
    pub resolved_at: Option<DateTime<Utc>>,
    pub failed_checks: usize,
}

impl Incident {
    /// Length of the outage; ongoing incidents are measured up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        self.resolved_at.unwrap_or(now) - self.started_at
    }

    pub fn is_ongoing(&self) -> bool {
        self.resolved_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UptimeSummary {
    pub website_id: i32,
    pub window_hours: u32,
    pub total_checks: usize,
    pub up_checks: usize,
    pub down_checks: usize,
    /// 100.0 when there are no checks in the window.
    pub uptime_percentage: f64,
    /// Mean latency of `up` checks only.
    pub average_response_ms: Option<f64>,
    pub incidents: Vec<Incident>,
}

impl UptimeSummary {
    /// Builds a summary from checks ordered oldest first.
    pub fn from_checks(website_id: i32, window_hours: u32, checks: &[uptime_check::Model]) -> Self {
        let total_checks = checks.len();
        let up: Vec<&uptime_check::Model> = checks.iter().filter(|c| c.is_up()).collect();
        let up_checks = up.len();

        let uptime_percentage = if total_checks == 0 {
            100.0
        } else {
            up_checks as f64 / total_checks as f64 * 100.0
        };

        let average_response_ms = (!up.is_empty()).then(|| {
            up.iter().map(|c| c.response_time_ms as f64).sum::<f64>() / up.len() as f64
        });

        Self {
            website_id,
            window_hours,
            total_checks,
            up_checks,
            down_checks: total_checks - up_checks,
            uptime_percentage,
            average_response_ms,
            incidents: incidents(checks),
        }
    }
}

fn incidents(checks: &[uptime_check::Model]) -> Vec<Incident> {
    let mut found = Vec::new();
    let mut open: Option<Incident> = None;

    for check in checks {
        let at = check.checked_at.with_timezone(&Utc);
        match (check.is_up(), open.as_mut()) {
            (false, Some(incident)) => incident.failed_checks += 1,
            (false, None) => {
                open = Some(Incident {
                    started_at: at,
                    resolved_at: None,
                    failed_checks: 1,
                });
            }
            (true, Some(_)) => {
                if let Some(mut incident) = open.take() {
                    incident.resolved_at = Some(at);
                    found.push(incident);
                }
            }
            (true, None) => {}
        }
    }

    found.extend(open);
    found
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("a window of {hours} hours reaches past the earliest representable time")]
    WindowOutOfRange { hours: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn window_start(now: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours)).and_then(|window| now.checked_sub_signed(window))
}

/// Loads checks from the last `hours` hours and summarizes them.
pub async fn uptime_summary(
    checks: &UptimeCheckRepository,
    website_id: i32,
    hours: u32,
) -> Result<UptimeSummary, StatsError> {
    let since = window_start(Utc::now(), hours).ok_or(StatsError::WindowOutOfRange { hours })?;
    let rows = checks.since(website_id, since).await?;
    Ok(UptimeSummary::from_checks(website_id, hours, &rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::uptime_check::{STATUS_DOWN, STATUS_UP};

    fn check(id: i32, up: bool, minutes: i64, latency: i64) -> uptime_check::Model {
        let base = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap();
        uptime_check::Model {
            id,
            website_id: 1,
            status: if up { STATUS_UP } else { STATUS_DOWN }.to_string(),
            response_time_ms: latency,
            status_code: if up { 200 } else { 503 },
            error_message: None,
            checked_at: base + Duration::minutes(minutes),
        }
    }

    #[test]
    fn empty_window_is_fully_up() {
        let summary = UptimeSummary::from_checks(1, 24, &[]);
        assert_eq!(summary.uptime_percentage, 100.0);
        assert_eq!(summary.average_response_ms, None);
        assert!(summary.incidents.is_empty());
    }

    #[test]
    fn percentage_and_latency_use_up_checks() {
        let checks = vec![
            check(1, true, 0, 100),
            check(2, false, 5, 9000),
            check(3, true, 10, 300),
            check(4, true, 15, 200),
        ];
        let summary = UptimeSummary::from_checks(1, 24, &checks);
        assert_eq!(summary.total_checks, 4);
        assert_eq!(summary.down_checks, 1);
        assert_eq!(summary.uptime_percentage, 75.0);
        assert_eq!(summary.average_response_ms, Some(200.0));
    }

    #[test]
    fn window_start_rejects_out_of_range_windows() {
        let now = Utc::now();
        assert_eq!(window_start(now, 24), Some(now - Duration::hours(24)));
        assert_eq!(window_start(now, u32::MAX), None);
    }

    #[test]
    fn incidents_are_runs_of_down_checks() {
        let checks = vec![
            check(1, true, 0, 10),
            check(2, false, 5, 10),
            check(3, false, 10, 10),
            check(4, true, 15, 10),
            check(5, false, 20, 10),
        ];
        let found = incidents(&checks);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].failed_checks, 2);
        assert_eq!(found[0].duration(Utc::now()), Duration::minutes(10));
        assert!(!found[0].is_ongoing());

        assert_eq!(found[1].failed_checks, 1);
        assert!(found[1].is_ongoing());
    }
}
