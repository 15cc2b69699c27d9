use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::AdminAuth;
use crate::error::AppResult;
use crate::models::SourceOutcome;
use crate::services::FeedIngestService;

#[derive(Serialize)]
pub struct IngestRunResponse {
    pub results: Vec<SourceOutcome>,
}

/// POST /api/admin/feeds/ingest
///
/// Always 200 with a per-source scorecard once the source list is loaded,
/// even if every source failed.
pub async fn ingest_feeds(
    _admin: AdminAuth,
    ingest: web::Data<FeedIngestService>,
) -> AppResult<HttpResponse> {
    let results = ingest.ingest_all().await?;
    Ok(HttpResponse::Ok().json(IngestRunResponse { results }))
}

/// Configures the admin routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin").route("/feeds/ingest", web::post().to(ingest_feeds)),
    );
}
