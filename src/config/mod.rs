//! Configuration loading for The Ark.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `ARK_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "ARK_";

/// Application configuration derived from `ARK_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub uptime: UptimeConfig,
    #[serde(default)]
    pub feeds: FeedConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub mailer: MailerConfig,
}

/// Tick loop and worker pool parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_true")]
    pub enable_uptime: bool,
    #[serde(default = "default_true")]
    pub enable_rss: bool,
}

/// A website to create on startup when it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteSeed {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct UptimeConfig {
    /// Interval given to seeded websites.
    #[serde(default = "default_uptime_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_check_timeout_seconds")]
    pub check_timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed_websites: Vec<WebsiteSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FeedConfig {
    /// Interval given to seeded feeds.
    #[serde(default = "default_rss_fetch_interval")]
    pub fetch_interval_seconds: u64,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_rss_user_agent")]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seed_feeds: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AlertConfig {
    /// Without a recipient alerts are evaluated and logged but never sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default = "default_down_cooldown_seconds")]
    pub down_cooldown_seconds: u64,
    #[serde(default = "default_recovery_cooldown_seconds")]
    pub recovery_cooldown_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MailerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_mailer_sender")]
    pub sender: String,
    #[serde(default = "default_mailer_api_url")]
    pub api_url: String,
    #[serde(default = "default_mailer_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_mailer_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_mailer_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            db_path: default_db_path(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            scheduler: SchedulerConfig::default(),
            uptime: UptimeConfig::default(),
            feeds: FeedConfig::default(),
            alerts: AlertConfig::default(),
            mailer: MailerConfig::default(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval_seconds(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            enable_uptime: true,
            enable_rss: true,
        }
    }
}

impl Default for UptimeConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_uptime_check_interval(),
            check_timeout_seconds: default_check_timeout_seconds(),
            seed_websites: Vec::new(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fetch_interval_seconds: default_rss_fetch_interval(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            user_agent: default_rss_user_agent(),
            seed_feeds: Vec::new(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            down_cooldown_seconds: default_down_cooldown_seconds(),
            recovery_cooldown_seconds: default_recovery_cooldown_seconds(),
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sender: default_mailer_sender(),
            api_url: default_mailer_api_url(),
            timeout_seconds: default_mailer_timeout_seconds(),
            max_attempts: default_mailer_max_attempts(),
            retry_delay_ms: default_mailer_retry_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.mailer.api_key.is_some() {
            config.mailer.api_key = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// True when alerts can actually be delivered.
    pub fn alerts_deliverable(&self) -> bool {
        self.alerts.recipient.is_some() && self.mailer.api_key.is_some()
    }

    /// Validates the configuration, returning the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections {
                value: self.db_max_connections,
            });
        }

        self.scheduler.validate()?;
        self.uptime.validate()?;
        self.feeds.validate()?;
        self.alerts.validate()?;
        self.mailer.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_db_path() -> String {
    "./ark.db".to_string()
}

fn default_database_url() -> String {
    sqlite_url(&default_db_path())
}

fn sqlite_url(path: &str) -> String {
    format!("sqlite://{path}?mode=rwc")
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_tick_interval_seconds() -> u64 {
    30
}

fn default_max_concurrent_fetches() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_uptime_check_interval() -> u64 {
    300
}

fn default_check_timeout_seconds() -> u64 {
    10
}

fn default_rss_fetch_interval() -> u64 {
    3600
}

fn default_fetch_timeout_seconds() -> u64 {
    30
}

fn default_rss_user_agent() -> String {
    "The Ark RSS Reader/1.0".to_string()
}

fn default_down_cooldown_seconds() -> u64 {
    60 * 60
}

fn default_recovery_cooldown_seconds() -> u64 {
    24 * 60 * 60
}

fn default_mailer_sender() -> String {
    "The Ark <ark@alexbates.dev>".to_string()
}

fn default_mailer_api_url() -> String {
    "https://api.smtp2go.com/v3/email/send".to_string()
}

fn default_mailer_timeout_seconds() -> u64 {
    10
}

fn default_mailer_max_attempts() -> u32 {
    3
}

fn default_mailer_retry_delay_ms() -> u64 {
    500
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid value for ARK_{key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("database max connections must be positive, got {value}")]
    InvalidDbMaxConnections { value: u32 },
    #[error("scheduler tick interval must be between 5 and 3600 seconds, got {value}")]
    InvalidTickInterval { value: u64 },
    #[error("max concurrent fetches must be between 1 and 20, got {value}")]
    InvalidMaxConcurrentFetches { value: usize },
    #[error("uptime check interval must be between 30 and 86400 seconds, got {value}")]
    InvalidUptimeCheckInterval { value: u64 },
    #[error("check timeout must be between 1 and 120 seconds, got {value}")]
    InvalidCheckTimeout { value: u64 },
    #[error("RSS fetch interval must be between 300 and 86400 seconds, got {value}")]
    InvalidRssFetchInterval { value: u64 },
    #[error("fetch timeout must be between 1 and 120 seconds, got {value}")]
    InvalidFetchTimeout { value: u64 },
    #[error("seed URL '{value}' is not an absolute http(s) URL")]
    InvalidSeedUrl { value: String },
    #[error("alert recipient '{value}' is not an email address")]
    InvalidAlertRecipient { value: String },
    #[error("mailer timeout must be between 1 and 120 seconds, got {value}")]
    InvalidMailerTimeout { value: u64 },
    #[error("mailer max attempts must be between 1 and 10, got {value}")]
    InvalidMailerAttempts { value: u32 },
    #[error("mailer API URL '{value}' is invalid")]
    InvalidMailerApiUrl { value: String },
}

fn validate_http_url(value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ConfigError::InvalidSeedUrl {
            value: value.to_string(),
        }),
    }
}

impl SchedulerConfig {
    /// Validate scheduler configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=3600).contains(&self.tick_interval_seconds) {
            return Err(ConfigError::InvalidTickInterval {
                value: self.tick_interval_seconds,
            });
        }
        if !(1..=20).contains(&self.max_concurrent_fetches) {
            return Err(ConfigError::InvalidMaxConcurrentFetches {
                value: self.max_concurrent_fetches,
            });
        }
        Ok(())
    }
}

impl UptimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(30..=86_400).contains(&self.check_interval_seconds) {
            return Err(ConfigError::InvalidUptimeCheckInterval {
                value: self.check_interval_seconds,
            });
        }
        if !(1..=120).contains(&self.check_timeout_seconds) {
            return Err(ConfigError::InvalidCheckTimeout {
                value: self.check_timeout_seconds,
            });
        }
        for seed in &self.seed_websites {
            validate_http_url(&seed.url)?;
        }
        Ok(())
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(300..=86_400).contains(&self.fetch_interval_seconds) {
            return Err(ConfigError::InvalidRssFetchInterval {
                value: self.fetch_interval_seconds,
            });
        }
        if !(1..=120).contains(&self.fetch_timeout_seconds) {
            return Err(ConfigError::InvalidFetchTimeout {
                value: self.fetch_timeout_seconds,
            });
        }
        for url in &self.seed_feeds {
            validate_http_url(url)?;
        }
        Ok(())
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(recipient) = &self.recipient {
            let mut parts = recipient.split('@');
            let valid = matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(local), Some(domain), None) if !local.is_empty() && domain.contains('.')
            );
            if !valid {
                return Err(ConfigError::InvalidAlertRecipient {
                    value: recipient.clone(),
                });
            }
        }
        Ok(())
    }
}

impl MailerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=120).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidMailerTimeout {
                value: self.timeout_seconds,
            });
        }
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::InvalidMailerAttempts {
                value: self.max_attempts,
            });
        }
        if Url::parse(&self.api_url).is_err() {
            return Err(ConfigError::InvalidMailerApiUrl {
                value: self.api_url.clone(),
            });
        }
        Ok(())
    }
}

/// Parses `Name=https://url` pairs; an entry without a name uses its URL.
fn parse_website_seeds(raw: &str) -> Vec<WebsiteSeed> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, url)) if !name.trim().is_empty() => WebsiteSeed {
                name: name.trim().to_string(),
                url: url.trim().to_string(),
            },
            Some((_, url)) => WebsiteSeed {
                name: url.trim().to_string(),
                url: url.trim().to_string(),
            },
            None => WebsiteSeed {
                name: entry.to_string(),
                url: entry.to_string(),
            },
        })
        .collect()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Typed access to the merged `ARK_*` values. Every lookup removes its key.
struct Layered(BTreeMap<String, String>);

impl Layered {
    fn string(&mut self, key: &str) -> Option<String> {
        self.0.remove(key).and_then(non_empty)
    }

    fn parsed<T: std::str::FromStr>(
        &mut self,
        key: &'static str,
        default: fn() -> T,
    ) -> Result<T, ConfigError> {
        match self.string(key) {
            None => Ok(default()),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value }),
        }
    }

    fn flag(&mut self, key: &'static str) -> Result<bool, ConfigError> {
        match self.string(key) {
            None => Ok(true),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue { key, value }),
            },
        }
    }
}

/// Loads configuration using layered `.env` files and `ARK_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut values, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                values.insert(stripped.to_string(), value);
            }
        }
        let mut layered = Layered(values);

        let profile = layered.string("PROFILE").unwrap_or(profile_hint);
        let log_level = layered.string("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = layered
            .string("LOG_FORMAT")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_else(default_log_format);
        let db_path = layered.string("DB_PATH").unwrap_or_else(default_db_path);
        let database_url = layered
            .string("DATABASE_URL")
            .unwrap_or_else(|| sqlite_url(&db_path));
        let db_max_connections =
            layered.parsed("DB_MAX_CONNECTIONS", default_db_max_connections)?;
        let db_acquire_timeout_ms =
            layered.parsed("DB_ACQUIRE_TIMEOUT_MS", default_db_acquire_timeout_ms)?;

        let scheduler = SchedulerConfig {
            tick_interval_seconds: layered
                .parsed("TICK_INTERVAL_SECONDS", default_tick_interval_seconds)?,
            max_concurrent_fetches: layered
                .parsed("RSS_MAX_CONCURRENT_FETCHES", default_max_concurrent_fetches)?,
            enable_uptime: layered.flag("ENABLE_UPTIME")?,
            enable_rss: layered.flag("ENABLE_RSS")?,
        };

        let uptime = UptimeConfig {
            check_interval_seconds: layered
                .parsed("UPTIME_CHECK_INTERVAL", default_uptime_check_interval)?,
            check_timeout_seconds: layered
                .parsed("CHECK_TIMEOUT_SECONDS", default_check_timeout_seconds)?,
            seed_websites: layered
                .string("SEED_WEBSITES")
                .map(|raw| parse_website_seeds(&raw))
                .unwrap_or_default(),
        };

        let feeds = FeedConfig {
            fetch_interval_seconds: layered
                .parsed("RSS_FETCH_INTERVAL", default_rss_fetch_interval)?,
            fetch_timeout_seconds: layered
                .parsed("FETCH_TIMEOUT_SECONDS", default_fetch_timeout_seconds)?,
            user_agent: layered
                .string("RSS_USER_AGENT")
                .unwrap_or_else(default_rss_user_agent),
            seed_feeds: layered
                .string("SEED_FEEDS")
                .map(|raw| parse_list(&raw))
                .unwrap_or_default(),
        };

        let alerts = AlertConfig {
            recipient: layered.string("ALERT_RECIPIENT"),
            down_cooldown_seconds: layered
                .parsed("ALERT_DOWN_COOLDOWN_SECONDS", default_down_cooldown_seconds)?,
            recovery_cooldown_seconds: layered.parsed(
                "ALERT_RECOVERY_COOLDOWN_SECONDS",
                default_recovery_cooldown_seconds,
            )?,
        };

        let mailer = MailerConfig {
            api_key: layered.string("SMTP2GO_API_KEY"),
            sender: layered
                .string("SMTP2GO_SENDER")
                .unwrap_or_else(default_mailer_sender),
            api_url: layered
                .string("SMTP2GO_API_URL")
                .unwrap_or_else(default_mailer_api_url),
            timeout_seconds: layered
                .parsed("MAILER_TIMEOUT_SECONDS", default_mailer_timeout_seconds)?,
            max_attempts: layered.parsed("MAILER_MAX_ATTEMPTS", default_mailer_max_attempts)?,
            retry_delay_ms: layered.parsed("MAILER_RETRY_DELAY_MS", default_mailer_retry_delay_ms)?,
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            db_path,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            scheduler,
            uptime,
            feeds,
            alerts,
            mailer,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("ARK_PROFILE")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
