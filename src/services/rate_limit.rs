use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::models::UsageKey;
use crate::store::UsageStore;

/// Outcome of a daily limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests counted for the caller today, 0 when the counter was unreachable
    pub count: i64,
}

impl RateLimitDecision {
    fn allow(count: i64) -> Self {
        Self {
            allowed: true,
            count,
        }
    }

    fn deny(count: i64) -> Self {
        Self {
            allowed: false,
            count,
        }
    }
}

/// Per-address daily request limiter.
///
/// Counting is best effort: store failures never block traffic.
#[derive(Clone)]
pub struct RateLimitService {
    store: Arc<dyn UsageStore>,
    limit: i64,
}

impl RateLimitService {
    pub fn new(store: Arc<dyn UsageStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            limit: config.daily_limit.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Counts one request from `address` against today's (UTC) budget
    pub async fn check_limit(&self, address: &str) -> RateLimitDecision {
        self.check_limit_at(address, Utc::now()).await
    }

    /// Same as [`check_limit`](Self::check_limit) with an explicit clock
    pub async fn check_limit_at(&self, address: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let key = UsageKey::at(address, now);

        match self.store.increment_usage(&key, self.limit, now).await {
            Ok(Some(count)) => RateLimitDecision {
                allowed: count <= self.limit,
                count,
            },
            Ok(None) => self.capped(&key).await,
            Err(e) => {
                log::warn!(
                    "Usage increment failed for {} on {}, using read-then-write: {}",
                    key.address,
                    key.day,
                    e
                );
                self.read_then_write(&key, now).await
            }
        }
    }

    /// Counter already at the cap: report the stored count without writing
    async fn capped(&self, key: &UsageKey) -> RateLimitDecision {
        match self.store.get_usage(key).await {
            Ok(Some(usage)) => RateLimitDecision::deny(usage.request_count),
            Ok(None) => RateLimitDecision::deny(self.limit),
            Err(e) => {
                log::warn!("Failed to read capped usage for {}: {}", key.address, e);
                RateLimitDecision::deny(self.limit)
            }
        }
    }

    async fn read_then_write(&self, key: &UsageKey, now: DateTime<Utc>) -> RateLimitDecision {
        let usage = match self.store.get_usage(key).await {
            Ok(Some(usage)) => usage,
            Ok(None) => return RateLimitDecision::allow(0),
            Err(e) => {
                log::warn!("Usage store unavailable, failing open: {}", e);
                return RateLimitDecision::allow(0);
            }
        };

        if usage.request_count >= self.limit {
            return RateLimitDecision::deny(usage.request_count);
        }

        match self.store.bump_usage(key, now).await {
            Ok(updated) => RateLimitDecision::allow(updated.request_count),
            Err(e) => {
                log::warn!("Failed to bump usage for {}: {}", key.address, e);
                RateLimitDecision::allow(usage.request_count)
            }
        }
    }
}

/// Seconds until the next UTC midnight, when every counter resets
pub fn seconds_until_reset(now: DateTime<Utc>) -> u64 {
    let tomorrow = now.date_naive() + Duration::days(1);
    let reset = tomorrow.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());

    match reset {
        Some(reset) => (reset - now).num_seconds().max(1) as u64,
        None => 1,
    }
}
