//! # Feeds
//!
//! Fetching and parsing of RSS and Atom documents into a format-neutral
//! [`ParsedFeed`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod dates;
pub mod fetcher;
pub mod parser;

pub use dates::parse_date;
pub use fetcher::HttpFeedFetcher;
pub use parser::parse_feed;

/// Channel-level data plus every item the document contained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub articles: Vec<ParsedArticle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArticle {
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    pub author: String,
    pub guid: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl ParsedArticle {
    /// Identity used for de-duplication: the GUID, else the link.
    pub fn dedup_key(&self) -> Option<&str> {
        [self.guid.trim(), self.link.trim()]
            .into_iter()
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unparseable feed: {reason}")]
    Unparseable { reason: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch feed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("feed returned status {status}")]
    Status { status: u16 },
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Anything that can turn a feed URL into a [`ParsedFeed`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_prefers_guid_then_link() {
        let mut article = ParsedArticle {
            guid: "urn:1".into(),
            link: "http://example.test/a".into(),
            ..Default::default()
        };
        assert_eq!(article.dedup_key(), Some("urn:1"));

        article.guid = "  ".into();
        assert_eq!(article.dedup_key(), Some("http://example.test/a"));

        article.link.clear();
        assert_eq!(article.dedup_key(), None);
    }
}
