//! PostgreSQL pool setup.

use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

pub type DbPool = PgPool;

/// Builds the pool. Every session runs in UTC so `CURRENT_DATE` and the
/// usage day agree.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    log::info!(
        "Opening database pool (max {}, min {})",
        config.max_connections,
        config.min_connections
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .after_connect(|conn, _meta| Box::pin(utc_session(conn)))
        .connect(&config.url)
        .await
}

async fn utc_session(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SET timezone = 'UTC'").execute(conn).await?;
    Ok(())
}

/// Applies the embedded `migrations/` directory
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database schema up to date");
    Ok(())
}

/// Round-trips a trivial query
pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
