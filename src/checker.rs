//! # Website Checker
//!
//! One outbound GET per check, timed. A website is up only when it answers
//! with exactly HTTP 200. Network failures are results, not errors: they come
//! back as `up = false`, `status_code = 0` and the failure text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

/// Outcome of probing a website once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub up: bool,
    pub status_code: u16,
    pub latency_ms: i64,
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn from_status(status: StatusCode, latency: Duration) -> Self {
        Self {
            up: status == StatusCode::OK,
            status_code: status.as_u16(),
            latency_ms: millis(latency),
            error: None,
        }
    }

    pub fn unreachable(error: impl Into<String>, latency: Duration) -> Self {
        Self {
            up: false,
            status_code: 0,
            latency_ms: millis(latency),
            error: Some(error.into()),
        }
    }
}

fn millis(latency: Duration) -> i64 {
    i64::try_from(latency.as_millis()).unwrap_or(i64::MAX)
}

/// Probes a single URL. Implementations hold no per-target state.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, url: &str) -> CheckOutcome;
}

/// reqwest-backed checker with an explicit request timeout.
#[derive(Clone)]
pub struct HttpChecker {
    client: Client,
}

impl HttpChecker {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, url: &str) -> CheckOutcome {
        let started = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) => {
                let outcome = CheckOutcome::from_status(response.status(), started.elapsed());
                debug!(
                    url,
                    status_code = outcome.status_code,
                    latency_ms = outcome.latency_ms,
                    "website responded"
                );
                outcome
            }
            Err(err) => {
                warn!(url, error = %err, "website check failed");
                CheckOutcome::unreachable(err.to_string(), started.elapsed())
            }
        }
    }
}
