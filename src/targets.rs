//! Monitored targets.
//!
//! A [`Target`] is either a website (checked for reachability) or a feed
//! (fetched for new articles). Both carry a poll interval and the time they
//! were last polled, so one scheduler can gate and dispatch either kind.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{feed, website};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Website,
    Feed,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Website => "website",
            TargetKind::Feed => "feed",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a target across both tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetKey {
    pub kind: TargetKind,
    pub id: i32,
}

impl TargetKey {
    pub fn website(id: i32) -> Self {
        Self {
            kind: TargetKind::Website,
            id,
        }
    }

    pub fn feed(id: i32) -> Self {
        Self {
            kind: TargetKind::Feed,
            id,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Website(website::Model),
    Feed(feed::Model),
}

impl Target {
    pub fn key(&self) -> TargetKey {
        match self {
            Target::Website(site) => TargetKey::website(site.id),
            Target::Feed(feed) => TargetKey::feed(feed.id),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.key().kind
    }

    pub fn url(&self) -> &str {
        match self {
            Target::Website(site) => &site.url,
            Target::Feed(feed) => &feed.url,
        }
    }

    /// Configured poll interval. Non-positive values mean "every cycle".
    pub fn interval(&self) -> Duration {
        let seconds = match self {
            Target::Website(site) => site.check_interval,
            Target::Feed(feed) => feed.fetch_interval,
        };
        Duration::seconds(i64::from(seconds.max(0)))
    }

    pub fn last_polled(&self) -> Option<DateTime<Utc>> {
        let polled = match self {
            Target::Website(site) => site.last_checked_at,
            Target::Feed(feed) => feed.last_fetched,
        };
        polled.map(|at| at.with_timezone(&Utc))
    }

    /// A target is due when it was never polled or its interval has fully elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_polled() {
            None => true,
            Some(last) => now - last >= self.interval(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Target::Website(site) => site.is_active,
            Target::Feed(feed) => feed.enabled,
        }
    }
}
