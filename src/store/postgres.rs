use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{FeedStore, StoreResult, UsageStore};
use crate::db::DbPool;
use crate::models::{DailyUsage, FeedSource, InsertOutcome, NewFeedItem, UsageKey};

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PgStore {
    async fn increment_usage(
        &self,
        key: &UsageKey,
        limit: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<i64>> {
        // The conflict target serializes concurrent callers. When the WHERE
        // clause rejects the update no row comes back.
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO daily_usage (ip_address, usage_date, request_count, last_seen_at)
            VALUES ($1, $2, 1, $3)
            ON CONFLICT (ip_address, usage_date) DO UPDATE
            SET request_count = daily_usage.request_count + 1,
                last_seen_at = EXCLUDED.last_seen_at
            WHERE daily_usage.request_count < $4
            RETURNING request_count
            "#,
        )
        .bind(&key.address)
        .bind(key.day)
        .bind(now)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count)
    }

    async fn get_usage(&self, key: &UsageKey) -> StoreResult<Option<DailyUsage>> {
        let usage = sqlx::query_as::<_, DailyUsage>(
            r#"
            SELECT ip_address, usage_date, request_count, last_seen_at
            FROM daily_usage
            WHERE ip_address = $1 AND usage_date = $2
            "#,
        )
        .bind(&key.address)
        .bind(key.day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(usage)
    }

    async fn bump_usage(&self, key: &UsageKey, now: DateTime<Utc>) -> StoreResult<DailyUsage> {
        let usage = sqlx::query_as::<_, DailyUsage>(
            r#"
            UPDATE daily_usage
            SET request_count = request_count + 1,
                last_seen_at = $3
            WHERE ip_address = $1 AND usage_date = $2
            RETURNING ip_address, usage_date, request_count, last_seen_at
            "#,
        )
        .bind(&key.address)
        .bind(key.day)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(usage)
    }
}

#[async_trait]
impl FeedStore for PgStore {
    async fn active_sources(&self) -> StoreResult<Vec<FeedSource>> {
        let sources = sqlx::query_as::<_, FeedSource>(
            r#"
            SELECT id, name, url, category, is_active, last_fetched_at
            FROM feed_sources
            WHERE is_active = TRUE
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sources)
    }

    async fn insert_item_if_absent(&self, item: &NewFeedItem) -> StoreResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO feed_items
                (source_id, title, link, summary, content, author, image_url, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (link) DO NOTHING
            "#,
        )
        .bind(item.source_id)
        .bind(&item.title)
        .bind(&item.link)
        .bind(&item.summary)
        .bind(&item.content)
        .bind(&item.author)
        .bind(&item.image_url)
        .bind(item.published_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn mark_fetched(&self, source_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE feed_sources SET last_fetched_at = $1 WHERE id = $2")
            .bind(at)
            .bind(source_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
