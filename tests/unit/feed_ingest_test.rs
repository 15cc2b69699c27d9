//! Unit tests for the feed ingestion pipeline
//!
//! Uses the in-memory store and a stub fetcher to exercise dedup, per-source
//! isolation and the scorecard.

use canopy::config::FeedConfig;
use canopy::error::AppError;
use canopy::models::{SourceOutcome, SourceResult};
use canopy::services::FeedIngestService;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{
    feed_source, numbered_feed, rss_document, MemoryStore, RssItemBuilder, StubFetcher,
    StubResponse,
};

fn service(store: &Arc<MemoryStore>, fetcher: StubFetcher) -> FeedIngestService {
    let config = FeedConfig {
        fetch_timeout: Duration::from_millis(200),
        ..FeedConfig::default()
    };
    FeedIngestService::new(store.clone(), Arc::new(fetcher), &config)
}

fn success(source: &str, inserted: usize, skipped: usize, total: usize) -> SourceOutcome {
    SourceOutcome::success(source, inserted, skipped, total)
}

// =============================================================================
// Dedup Tests
// =============================================================================

#[tokio::test]
async fn test_new_items_are_inserted() {
    let source = feed_source("Daily Leaf", "https://leaf.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Body(numbered_feed("leaf", 3)));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(results, vec![success("Daily Leaf", 3, 0, 3)]);
    assert_eq!(store.items().len(), 3);
    assert!(store.items().iter().all(|i| i.source_id == source.id));
}

#[tokio::test]
async fn test_second_pass_inserts_nothing() {
    let source = feed_source("Daily Leaf", "https://leaf.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Body(numbered_feed("leaf", 4)));
    let service = service(&store, fetcher);

    let first = service.ingest_all().await.unwrap();
    let second = service.ingest_all().await.unwrap();

    assert_eq!(first, vec![success("Daily Leaf", 4, 0, 4)]);
    assert_eq!(second, vec![success("Daily Leaf", 0, 4, 4)]);
    assert_eq!(store.items().len(), 4);
}

#[tokio::test]
async fn test_duplicate_links_across_sources_are_skipped() {
    let a = feed_source("A", "https://a.example.com/rss");
    let b = feed_source("B", "https://b.example.com/rss");
    let shared = numbered_feed("shared", 2);
    let store = Arc::new(MemoryStore::with_sources(vec![a.clone(), b.clone()]));
    let fetcher = StubFetcher::new()
        .with(&a.url, StubResponse::Body(shared.clone()))
        .with(&b.url, StubResponse::Body(shared));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    let inserted: usize = results
        .iter()
        .map(|r| match r.result {
            SourceResult::Success { inserted, .. } => inserted,
            SourceResult::Error { .. } => 0,
        })
        .sum();
    assert_eq!(inserted, 2);
    assert_eq!(store.items().len(), 2);
}

#[tokio::test]
async fn test_malformed_items_are_not_counted() {
    let source = feed_source("Mixed", "https://mixed.example.com/rss");
    let doc = rss_document(&[
        RssItemBuilder::new("Good", "https://mixed.example.com/good").build(),
        RssItemBuilder::unlinked("No link").build(),
        RssItemBuilder::untitled("https://mixed.example.com/no-title").build(),
    ]);
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Body(doc));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(results, vec![success("Mixed", 1, 0, 1)]);
}

#[tokio::test]
async fn test_insert_failure_counts_as_skipped() {
    let source = feed_source("Flaky", "https://flaky.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    store.fail_link("https://flaky.example.com/story-2");
    let fetcher =
        StubFetcher::new().with(&source.url, StubResponse::Body(numbered_feed("flaky", 3)));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(results, vec![success("Flaky", 2, 1, 3)]);
}

#[tokio::test]
async fn test_item_cap_applies_per_source() {
    let source = feed_source("Busy", "https://busy.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Body(numbered_feed("busy", 35)));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(results, vec![success("Busy", 20, 0, 20)]);
    assert!(store
        .items()
        .iter()
        .all(|i| i.link != "https://busy.example.com/story-21"));
}

// =============================================================================
// Per-Source Isolation Tests
// =============================================================================

#[tokio::test]
async fn test_failing_source_does_not_affect_others() {
    let first = feed_source("First", "https://first.example.com/rss");
    let second = feed_source("Second", "https://second.example.com/rss");
    let third = feed_source("Third", "https://third.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![
        first.clone(),
        second.clone(),
        third.clone(),
    ]));
    let fetcher = StubFetcher::new()
        .with(&first.url, StubResponse::Body(numbered_feed("first", 2)))
        .with(&second.url, StubResponse::NetworkError)
        .with(&third.url, StubResponse::Body(numbered_feed("third", 3)));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0], success("First", 2, 0, 2));
    assert_eq!(results[1].source, "Second");
    assert!(matches!(results[1].result, SourceResult::Error { .. }));
    assert_eq!(results[2], success("Third", 3, 0, 3));

    assert!(store.last_fetched(first.id).is_some());
    assert!(store.last_fetched(second.id).is_none());
    assert!(store.last_fetched(third.id).is_some());
}

#[tokio::test]
async fn test_bad_status_reports_fetch_failure() {
    let source = feed_source("Gone", "https://gone.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Status(503));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(
        results,
        vec![SourceOutcome::error("Gone", "Failed to fetch feed")]
    );
}

#[tokio::test]
async fn test_hanging_source_times_out() {
    let slow = feed_source("Slow", "https://slow.example.com/rss");
    let fast = feed_source("Fast", "https://fast.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![slow.clone(), fast.clone()]));
    let fetcher = StubFetcher::new()
        .with(&slow.url, StubResponse::Hang)
        .with(&fast.url, StubResponse::Body(numbered_feed("fast", 1)));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(
        results,
        vec![
            SourceOutcome::error("Slow", "Timed out fetching feed"),
            success("Fast", 1, 0, 1),
        ]
    );
}

#[tokio::test]
async fn test_every_source_failing_still_returns_scorecard() {
    let a = feed_source("A", "https://a.example.com/rss");
    let b = feed_source("B", "https://b.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![a, b]));

    // Unknown URLs answer 404
    let results = service(&store, StubFetcher::new()).ingest_all().await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.is_success()));
}

#[tokio::test]
async fn test_mark_fetched_failure_is_source_error() {
    let source = feed_source("Stuck", "https://stuck.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    store.fail_mark_fetched.store(true, Ordering::SeqCst);
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Body(numbered_feed("stuck", 1)));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert!(!results[0].is_success());
    // Items written before the failure stay written
    assert_eq!(store.items().len(), 1);
}

#[tokio::test]
async fn test_empty_feed_still_marks_fetched() {
    let source = feed_source("Quiet", "https://quiet.example.com/rss");
    let store = Arc::new(MemoryStore::with_sources(vec![source.clone()]));
    let fetcher = StubFetcher::new().with(&source.url, StubResponse::Body(rss_document(&[])));

    let results = service(&store, fetcher).ingest_all().await.unwrap();

    assert_eq!(results, vec![success("Quiet", 0, 0, 0)]);
    assert!(store.last_fetched(source.id).is_some());
}

// =============================================================================
// Source List Tests
// =============================================================================

#[tokio::test]
async fn test_source_list_failure_fails_whole_run() {
    let store = Arc::new(MemoryStore::with_sources(vec![feed_source(
        "A",
        "https://a.example.com/rss",
    )]));
    store.fail_sources.store(true, Ordering::SeqCst);
    let fetcher = StubFetcher::new();
    let service = service(&store, fetcher);

    let result = service.ingest_all().await;

    assert!(matches!(result, Err(AppError::Store(_))));
}

#[tokio::test]
async fn test_inactive_sources_are_not_fetched() {
    let active = feed_source("Active", "https://active.example.com/rss");
    let mut inactive = feed_source("Inactive", "https://inactive.example.com/rss");
    inactive.is_active = false;
    let store = Arc::new(MemoryStore::with_sources(vec![active.clone(), inactive]));
    let fetcher = Arc::new(
        StubFetcher::new().with(&active.url, StubResponse::Body(numbered_feed("active", 1))),
    );
    let service = FeedIngestService::new(store.clone(), fetcher.clone(), &FeedConfig::default());

    let results = service.ingest_all().await.unwrap();

    assert_eq!(results, vec![success("Active", 1, 0, 1)]);
    assert_eq!(fetcher.calls(), vec![active.url.clone()]);
}

#[tokio::test]
async fn test_no_sources_returns_empty_scorecard() {
    let store = Arc::new(MemoryStore::new());
    let results = service(&store, StubFetcher::new()).ingest_all().await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_scorecard_serialization() {
    let ok = serde_json::to_value(success("A", 2, 1, 3)).unwrap();
    let err = serde_json::to_value(SourceOutcome::error("B", "Failed to fetch feed")).unwrap();

    assert_eq!(
        ok,
        serde_json::json!({"source": "A", "status": "success", "inserted": 2, "skipped": 1, "total": 3})
    );
    assert_eq!(
        err,
        serde_json::json!({"source": "B", "status": "error", "message": "Failed to fetch feed"})
    );
}
