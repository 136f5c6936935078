//! # Alert Notifier
//!
//! Delivers website alerts by email through the SMTP2GO HTTP API, retrying a
//! bounded number of times.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::alerting::AlertKind;
use crate::config::MailerConfig;

/// Everything needed to render one alert email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub website_name: String,
    pub website_url: String,
    pub kind: AlertKind,
    /// True when the website was already down at the previous check.
    pub reminder: bool,
    pub status_code: i32,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("website_name", &self.website_name);
        context.insert("website_url", &self.website_url);
        context.insert("kind", self.kind.as_str());
        context.insert("reminder", &self.reminder);
        context.insert("status_code", &self.status_code);
        context.insert("error", &self.error);
        context.insert("timestamp", &self.formatted_timestamp());
        context
    }
}

const SUBJECT_TEMPLATE: &str = "alert_subject.txt";
const TEXT_TEMPLATE: &str = "alert_body.txt";
const HTML_TEMPLATE: &str = "alert_body.html";

/// Subject and bodies of one alert email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAlert {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Alert email templates compiled into the binary. Output of the `.html`
/// template is autoescaped.
pub struct AlertTemplates {
    tera: Tera,
}

impl AlertTemplates {
    pub fn new() -> Result<Self, NotifyError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                SUBJECT_TEMPLATE,
                include_str!("../templates/alert_subject.txt"),
            ),
            (TEXT_TEMPLATE, include_str!("../templates/alert_body.txt")),
            (HTML_TEMPLATE, include_str!("../templates/alert_body.html")),
        ])?;
        Ok(Self { tera })
    }

    pub fn render(&self, message: &AlertMessage) -> Result<RenderedAlert, NotifyError> {
        let context = message.context();
        Ok(RenderedAlert {
            subject: self.tera.render(SUBJECT_TEMPLATE, &context)?.trim().to_string(),
            text_body: self.tera.render(TEXT_TEMPLATE, &context)?,
            html_body: self.tera.render(HTML_TEMPLATE, &context)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier not configured: {0}")]
    NotConfigured(&'static str),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("mail API request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("mail API returned status {status}")]
    Status { status: u16 },
    #[error("failed to decode mail API response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("failed to render alert email: {0}")]
    Template(#[from] tera::Error),
    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<NotifyError>,
    },
}

/// Outbound alert transport.
#[async_trait]
pub trait AlertSender: Send + Sync {
    async fn send_alert(&self, message: &AlertMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    api_key: &'a str,
    to: [&'a str; 1],
    sender: &'a str,
    subject: String,
    text_body: String,
    html_body: String,
}

#[derive(Debug, Default, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    data: SendEmailData,
}

#[derive(Debug, Default, Deserialize)]
struct SendEmailData {
    #[serde(default)]
    email_id: String,
}

/// SMTP2GO-backed [`AlertSender`].
pub struct Smtp2GoMailer {
    client: Client,
    api_url: String,
    api_key: String,
    sender: String,
    recipient: String,
    max_attempts: u32,
    retry_delay: Duration,
    templates: AlertTemplates,
}

impl Smtp2GoMailer {
    pub fn new(config: &MailerConfig, recipient: &str) -> Result<Self, NotifyError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(NotifyError::NotConfigured("ARK_SMTP2GO_API_KEY is not set"))?;
        if recipient.trim().is_empty() {
            return Err(NotifyError::NotConfigured("ARK_ALERT_RECIPIENT is empty"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(NotifyError::Client)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            sender: config.sender.clone(),
            recipient: recipient.to_string(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            templates: AlertTemplates::new()?,
        })
    }

    async fn post_once(&self, request: &SendEmailRequest<'_>) -> Result<String, NotifyError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .map_err(NotifyError::Request)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }

        let body: SendEmailResponse = response.json().await.map_err(NotifyError::Decode)?;
        Ok(if body.data.email_id.is_empty() {
            body.request_id
        } else {
            body.data.email_id
        })
    }

    fn backoff(&self) -> Duration {
        let base = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX);
        let jitter = rand::thread_rng().gen_range(0..=base / 5);
        Duration::from_millis(base.saturating_add(jitter))
    }

    fn redacted_target(&self) -> String {
        Url::parse(&self.api_url)
            .ok()
            .map(|parsed| {
                let host = parsed.host_str().unwrap_or("unknown");
                format!("{}://{}", parsed.scheme(), host)
            })
            .unwrap_or_else(|| "[invalid-url]".to_string())
    }
}

#[async_trait]
impl AlertSender for Smtp2GoMailer {
    async fn send_alert(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        let rendered = self.templates.render(message)?;
        let request = SendEmailRequest {
            api_key: &self.api_key,
            to: [&self.recipient],
            sender: &self.sender,
            subject: rendered.subject,
            text_body: rendered.text_body,
            html_body: rendered.html_body,
        };

        let mut attempt = 1;
        loop {
            match self.post_once(&request).await {
                Ok(email_id) => {
                    info!(
                        kind = message.kind.as_str(),
                        website = %message.website_url,
                        attempt,
                        email_id = %email_id,
                        "alert email accepted"
                    );
                    return Ok(());
                }
                Err(err) if attempt >= self.max_attempts => {
                    return Err(NotifyError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        target_api = %self.redacted_target(),
                        attempt,
                        error = %err,
                        "alert email attempt failed"
                    );
                }
            }
            tokio::time::sleep(self.backoff()).await;
            attempt += 1;
        }
    }
}
