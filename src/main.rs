use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use std::fmt::Display;
use std::sync::Arc;

use canopy::config::Config;
use canopy::db;
use canopy::feeds::HttpFeedFetcher;
use canopy::routes;
use canopy::services::{FeedIngestService, RateLimitService};
use canopy::store::PgStore;

/// Logs a startup failure and turns it into the error `main` exits with
fn startup_error(stage: &str, e: impl Display) -> std::io::Error {
    log::error!("{} failed: {}", stage, e);
    std::io::Error::other(format!("{}: {}", stage, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("Configuration", e))?;
    log::info!("Starting Canopy server on {}:{}", config.host, config.port);

    let db_pool = db::create_pool(&config.database)
        .await
        .map_err(|e| startup_error("Database connection", e))?;
    db::run_migrations(&db_pool)
        .await
        .map_err(|e| startup_error("Migrations", e))?;

    let fetcher =
        HttpFeedFetcher::from_config(&config.feeds).map_err(|e| startup_error("Feed client", e))?;

    if config.admin.token.is_none() {
        log::warn!("ADMIN_TOKEN not set, the feed ingestion trigger is unauthenticated");
    }
    if config.integrations.marketing_sync_enabled() {
        log::info!("Marketing sync credentials present");
    }
    log::info!(
        "Daily request limit: {} per address",
        config.rate_limit.daily_limit
    );

    // One store handle shared by both services
    let store = Arc::new(PgStore::new(db_pool.clone()));
    let limiter = web::Data::new(RateLimitService::new(store.clone(), &config.rate_limit));
    let ingest = web::Data::new(FeedIngestService::new(
        store,
        Arc::new(fetcher),
        &config.feeds,
    ));
    let admin = web::Data::new(config.admin.clone());
    let pool = web::Data::new(db_pool);

    let server = HttpServer::new(move || {
        // The storefront is served from a different origin
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::RETRY_AFTER])
            .max_age(3600);

        App::new()
            .app_data(pool.clone())
            .app_data(limiter.clone())
            .app_data(ingest.clone())
            .app_data(admin.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            .configure(routes::health::configure)
            .configure(routes::admin::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .shutdown_timeout(30)
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        log::info!("Shutting down, draining in-flight requests");
        handle.stop(true).await;
    });

    server.await
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
                return;
            }
            Err(e) => log::error!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
