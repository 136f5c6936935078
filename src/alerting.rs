//! # Alert De-duplication
//!
//! Given a website's prior and current observation, decides whether an alert
//! should go out and records it when it does.
//!
//! | prior | current | candidate            |
//! |-------|---------|----------------------|
//! | none  | any     | none (first check)   |
//! | up    | down    | `down`               |
//! | down  | down    | `down` (reminder)    |
//! | down  | up      | `recovery`           |
//! | up    | up      | none                 |
//!
//! Every candidate is gated by the cooldown for its kind. The alert record is
//! written only after a successful send.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::AlertConfig;
use crate::models::{uptime_check, website};
use crate::notifier::{AlertMessage, AlertSender};
use crate::store::TargetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Down,
    Recovery,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Down => "down",
            AlertKind::Recovery => "recovery",
        }
    }
}

/// A state change (or lack of one) that is worth offering as an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentDown,
    StillDown,
    Recovered,
}

impl Transition {
    pub fn kind(&self) -> AlertKind {
        match self {
            Transition::WentDown | Transition::StillDown => AlertKind::Down,
            Transition::Recovered => AlertKind::Recovery,
        }
    }
}

/// Classifies a new observation against the previous one. `prior_up` is
/// `None` for the first observation of a website, which never alerts.
pub fn classify(prior_up: Option<bool>, current_up: bool) -> Option<Transition> {
    match (prior_up?, current_up) {
        (true, false) => Some(Transition::WentDown),
        (false, false) => Some(Transition::StillDown),
        (false, true) => Some(Transition::Recovered),
        (true, true) => None,
    }
}

/// Cooldown window per alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub down_cooldown: Duration,
    pub recovery_cooldown: Duration,
}

impl AlertPolicy {
    pub fn cooldown(&self, kind: AlertKind) -> Duration {
        match kind {
            AlertKind::Down => self.down_cooldown,
            AlertKind::Recovery => self.recovery_cooldown,
        }
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            down_cooldown: Duration::from_secs(60 * 60),
            recovery_cooldown: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl From<&AlertConfig> for AlertPolicy {
    fn from(config: &AlertConfig) -> Self {
        Self {
            down_cooldown: Duration::from_secs(config.down_cooldown_seconds),
            recovery_cooldown: Duration::from_secs(config.recovery_cooldown_seconds),
        }
    }
}

/// What happened to an observation's alert candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    NoCandidate,
    /// An alert of this kind was sent within the cooldown window.
    Suppressed(AlertKind),
    /// Sent; `recorded` is false if writing the alert record failed afterwards.
    Sent { kind: AlertKind, recorded: bool },
    SendFailed(AlertKind),
    /// The cooldown lookup failed, so nothing was sent.
    LookupFailed(AlertKind),
    /// No sender is configured.
    Disabled(AlertKind),
}

impl AlertDecision {
    fn outcome_label(&self) -> &'static str {
        match self {
            AlertDecision::NoCandidate => "none",
            AlertDecision::Suppressed(_) => "suppressed",
            AlertDecision::Sent { .. } => "sent",
            AlertDecision::SendFailed(_) => "send_failed",
            AlertDecision::LookupFailed(_) => "lookup_failed",
            AlertDecision::Disabled(_) => "disabled",
        }
    }
}

pub struct AlertDeduplicator {
    store: Arc<dyn TargetStore>,
    sender: Option<Arc<dyn AlertSender>>,
    policy: AlertPolicy,
}

impl AlertDeduplicator {
    pub fn new(
        store: Arc<dyn TargetStore>,
        sender: Option<Arc<dyn AlertSender>>,
        policy: AlertPolicy,
    ) -> Self {
        Self {
            store,
            sender,
            policy,
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Evaluates `current` against `prior` and sends at most one alert.
    pub async fn evaluate(
        &self,
        site: &website::Model,
        prior: Option<&uptime_check::Model>,
        current: &uptime_check::Model,
    ) -> AlertDecision {
        let Some(transition) = classify(prior.map(|p| p.is_up()), current.is_up()) else {
            return AlertDecision::NoCandidate;
        };
        let kind = transition.kind();

        let decision = self.dispatch(site, transition, current).await;
        counter!(
            "ark_alerts_total",
            "kind" => kind.as_str(),
            "outcome" => decision.outcome_label()
        )
        .increment(1);
        decision
    }

    async fn dispatch(
        &self,
        site: &website::Model,
        transition: Transition,
        current: &uptime_check::Model,
    ) -> AlertDecision {
        let kind = transition.kind();

        let Some(sender) = &self.sender else {
            info!(
                website_id = site.id,
                kind = kind.as_str(),
                "alert candidate dropped, no notifier configured"
            );
            return AlertDecision::Disabled(kind);
        };

        match self
            .store
            .should_alert(site.id, kind, self.policy.cooldown(kind))
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    website_id = site.id,
                    kind = kind.as_str(),
                    "alert suppressed by cooldown"
                );
                return AlertDecision::Suppressed(kind);
            }
            Err(err) => {
                error!(
                    website_id = site.id,
                    kind = kind.as_str(),
                    error = ?err,
                    "failed to check alert cooldown"
                );
                return AlertDecision::LookupFailed(kind);
            }
        }

        let message = AlertMessage {
            website_name: site.name.clone(),
            website_url: site.url.clone(),
            kind,
            reminder: transition == Transition::StillDown,
            status_code: current.status_code,
            error: current.error_message.clone(),
            timestamp: Utc::now(),
        };

        if let Err(err) = sender.send_alert(&message).await {
            error!(
                website_id = site.id,
                kind = kind.as_str(),
                error = %err,
                "failed to send alert"
            );
            return AlertDecision::SendFailed(kind);
        }

        let recorded = match self.store.record_alert_sent(site.id, kind).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    website_id = site.id,
                    kind = kind.as_str(),
                    error = ?err,
                    "alert sent but recording it failed"
                );
                false
            }
        };

        info!(
            website_id = site.id,
            url = %site.url,
            kind = kind.as_str(),
            "sent alert"
        );
        AlertDecision::Sent { kind, recorded }
    }
}
