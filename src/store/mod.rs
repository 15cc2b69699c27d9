//! Durable store collaborators.
//!
//! The rate limiter and the feed pipeline receive a store handle instead of
//! building a database client themselves. `PgStore` is the production
//! implementation; tests plug in their own.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{DailyUsage, FeedSource, InsertOutcome, NewFeedItem, UsageKey};

pub use postgres::PgStore;

/// Errors reported by a store implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for per-address daily request counters
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Atomically counts one request against `key`.
    ///
    /// Creates the row with a count of 1 when absent. Otherwise increments it
    /// only while the stored count is below `limit`. Returns the new count, or
    /// `None` when the row was already at the cap and nothing was written.
    async fn increment_usage(
        &self,
        key: &UsageKey,
        limit: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<i64>>;

    /// Reads the counter row for `key`, if any
    async fn get_usage(&self, key: &UsageKey) -> StoreResult<Option<DailyUsage>>;

    /// Unconditionally adds one to an existing row and refreshes last-seen
    async fn bump_usage(&self, key: &UsageKey, now: DateTime<Utc>) -> StoreResult<DailyUsage>;
}

/// Storage for feed sources and ingested items
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// All sources flagged active, in a stable order
    async fn active_sources(&self) -> StoreResult<Vec<FeedSource>>;

    /// Inserts the item unless one with the same link already exists
    async fn insert_item_if_absent(&self, item: &NewFeedItem) -> StoreResult<InsertOutcome>;

    async fn mark_fetched(&self, source_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}
