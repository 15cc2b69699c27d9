use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// External news feed, managed by admins
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeedSource {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub category: String,
    pub is_active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Feed item ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedItem {
    pub source_id: Uuid,
    pub title: String,
    /// Canonical link, unique across all sources
    pub link: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Result of an insert-or-ignore keyed on the canonical link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Per-source scorecard entry returned by an ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    #[serde(flatten)]
    pub result: SourceResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceResult {
    Success {
        inserted: usize,
        skipped: usize,
        total: usize,
    },
    Error {
        message: String,
    },
}

impl SourceOutcome {
    pub fn success(source: &str, inserted: usize, skipped: usize, total: usize) -> Self {
        Self {
            source: source.to_string(),
            result: SourceResult::Success {
                inserted,
                skipped,
                total,
            },
        }
    }

    pub fn error(source: &str, message: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            result: SourceResult::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, SourceResult::Success { .. })
    }
}
