use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Per-address request counter for one UTC calendar day
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyUsage {
    pub ip_address: String,
    pub usage_date: NaiveDate,
    pub request_count: i64,
    pub last_seen_at: DateTime<Utc>,
}

/// Composite key of a usage row: (caller address, UTC day)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub address: String,
    pub day: NaiveDate,
}

impl UsageKey {
    pub fn new(address: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            address: address.into(),
            day,
        }
    }

    /// Key for the UTC calendar day containing `at`
    pub fn at(address: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(address, at.date_naive())
    }
}
