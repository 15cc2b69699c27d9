use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::config::FeedConfig;
use crate::error::AppResult;
use crate::feeds::{FeedFetcher, FeedParser, FetchError};
use crate::models::{FeedSource, InsertOutcome, SourceOutcome};
use crate::store::{FeedStore, StoreError};

/// Sources fetched at the same time during one run
const MAX_CONCURRENT_SOURCES: usize = 4;

/// Failure that ends processing of a single source
#[derive(Debug, thiserror::Error)]
enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Pulls every active feed source and stores newly seen items.
///
/// Each source is isolated: a source that cannot be fetched, parsed or
/// recorded shows up as an error entry in the scorecard and never stops
/// the others.
pub struct FeedIngestService {
    store: Arc<dyn FeedStore>,
    fetcher: Arc<dyn FeedFetcher>,
    parser: FeedParser,
    fetch_timeout: Duration,
}

impl FeedIngestService {
    pub fn new(store: Arc<dyn FeedStore>, fetcher: Arc<dyn FeedFetcher>, config: &FeedConfig) -> Self {
        Self {
            store,
            fetcher,
            parser: FeedParser::new(config.max_items_per_source, config.summary_max_chars),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Runs ingestion for all active sources.
    ///
    /// Only a failure to load the source list fails the whole run. Outcomes
    /// come back in source order.
    pub async fn ingest_all(&self) -> AppResult<Vec<SourceOutcome>> {
        let sources = self.store.active_sources().await?;
        log::info!("Ingesting {} active feed sources", sources.len());

        let outcomes: Vec<SourceOutcome> = stream::iter(sources.iter())
            .map(|source| self.ingest_source(source))
            .buffered(MAX_CONCURRENT_SOURCES)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        log::info!(
            "Feed ingestion finished: {} sources, {} failed",
            outcomes.len(),
            failed
        );

        Ok(outcomes)
    }

    /// Ingests one source, converting any failure into an error outcome
    pub async fn ingest_source(&self, source: &FeedSource) -> SourceOutcome {
        match self.try_ingest_source(source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Feed source '{}' ({}) failed: {}", source.name, source.url, e);
                SourceOutcome::error(&source.name, e.to_string())
            }
        }
    }

    async fn try_ingest_source(&self, source: &FeedSource) -> Result<SourceOutcome, SourceError> {
        let body = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&source.url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let items = self.parser.parse(&body, Utc::now());
        let total = items.len();
        let mut inserted = 0;
        let mut skipped = 0;

        // Sequential so the tally matches what was written
        for item in items {
            let item = item.into_new_item(source.id);
            match self.store.insert_item_if_absent(&item).await {
                Ok(InsertOutcome::Inserted) => inserted += 1,
                Ok(InsertOutcome::AlreadyExists) => skipped += 1,
                Err(e) => {
                    log::warn!("Failed to store feed item {}: {}", item.link, e);
                    skipped += 1;
                }
            }
        }

        self.store.mark_fetched(source.id, Utc::now()).await?;

        log::info!(
            "Feed source '{}': {} inserted, {} skipped, {} total",
            source.name,
            inserted,
            skipped,
            total
        );

        Ok(SourceOutcome::success(&source.name, inserted, skipped, total))
    }
}
