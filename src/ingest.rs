//! # Feed Ingestion
//!
//! Feed binding of the engine. Fetches a feed, fills in metadata the first
//! time a title is discovered, and inserts articles that are not yet stored
//! for (feed, GUID).

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProcessError;
use crate::feeds::{FeedSource, ParsedFeed};
use crate::models::feed;
use crate::store::{FeedMetadata, NewArticle, TargetStore};

/// Per-feed counters for one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub seen: usize,
    pub added: usize,
    pub already_present: usize,
    /// Items with neither a GUID nor a link.
    pub skipped: usize,
    pub failed: usize,
    pub metadata_updated: bool,
}

pub struct FeedIngestor {
    store: Arc<dyn TargetStore>,
    source: Arc<dyn FeedSource>,
}

impl FeedIngestor {
    pub fn new(store: Arc<dyn TargetStore>, source: Arc<dyn FeedSource>) -> Self {
        Self { store, source }
    }

    /// Fetches `feed` and ingests its articles.
    ///
    /// Fetch and parse failures abort this feed only. A failure on a single
    /// article is logged and the remaining articles are still processed.
    #[instrument(skip_all, fields(feed_id = feed.id, url = %feed.url))]
    pub async fn process(
        &self,
        feed: &feed::Model,
        cancel: &CancellationToken,
    ) -> Result<IngestReport, ProcessError> {
        let parsed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProcessError::Cancelled),
            parsed = self.source.fetch(&feed.url) => parsed?,
        };

        let mut report = IngestReport {
            seen: parsed.articles.len(),
            ..IngestReport::default()
        };

        if let Some(metadata) = discovered_metadata(feed, &parsed) {
            match self.store.update_feed_metadata(feed.id, &metadata).await {
                Ok(()) => report.metadata_updated = true,
                Err(err) => error!(error = ?err, "failed to update feed metadata"),
            }
        }

        for article in &parsed.articles {
            let Some(guid) = article.dedup_key() else {
                debug!(title = %article.title, "skipping article without guid or link");
                report.skipped += 1;
                continue;
            };

            match self.store.article_exists(feed.id, guid).await {
                Ok(true) => {
                    report.already_present += 1;
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    error!(guid, error = ?err, "failed to check whether article exists");
                    report.failed += 1;
                    continue;
                }
            }

            match self
                .store
                .append_article(NewArticle::from_parsed(feed.id, guid, article))
                .await
            {
                Ok(true) => report.added += 1,
                Ok(false) => report.already_present += 1,
                Err(err) => {
                    error!(guid, error = ?err, "failed to store article");
                    report.failed += 1;
                }
            }
        }

        if let Err(err) = self.store.mark_feed_fetched(feed.id, Utc::now()).await {
            warn!(error = ?err, "failed to update feed last fetched time");
        }

        counter!("ark_articles_ingested_total").increment(report.added as u64);
        info!(
            seen = report.seen,
            added = report.added,
            failed = report.failed,
            "feed update completed"
        );
        Ok(report)
    }
}

/// Metadata to store when the feed has no title yet and the document has one.
fn discovered_metadata(feed: &feed::Model, parsed: &ParsedFeed) -> Option<FeedMetadata> {
    let title = parsed.title.trim();
    if title.is_empty() || !feed.title.trim().is_empty() {
        return None;
    }

    let non_empty = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };
    Some(FeedMetadata {
        title: title.to_string(),
        description: non_empty(&parsed.description),
        site_url: non_empty(&parsed.link),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::fixtures;

    #[test]
    fn metadata_filled_only_when_title_missing() {
        let parsed = ParsedFeed {
            title: "Example".into(),
            link: "https://example.test".into(),
            description: "  ".into(),
            ..ParsedFeed::default()
        };

        let mut feed = fixtures::feed(1, "https://example.test/rss", 3600);
        let metadata = discovered_metadata(&feed, &parsed).unwrap();
        assert_eq!(metadata.title, "Example");
        assert_eq!(metadata.description, None);
        assert_eq!(metadata.site_url.as_deref(), Some("https://example.test"));

        feed.title = "Already named".into();
        assert!(discovered_metadata(&feed, &parsed).is_none());
    }

    #[test]
    fn untitled_document_leaves_metadata_alone() {
        let feed = fixtures::feed(1, "https://example.test/rss", 3600);
        assert!(discovered_metadata(&feed, &ParsedFeed::default()).is_none());
    }
}
