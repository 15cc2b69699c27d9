use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Serialize;

use crate::db::{self, DbPool};
use crate::services::{seconds_until_reset, RateLimitService};

#[derive(Serialize)]
pub struct HeartbeatResponse {
    status: &'static str,
    count: i64,
    limit: i64,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    database: &'static str,
}

/// Address the daily budget is charged to
pub fn caller_address(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Heartbeat, limited per caller address per UTC day.
///
/// 200 when the database answers, 429 once the caller's budget is spent,
/// 500 when the database does not answer.
pub async fn heartbeat(
    req: HttpRequest,
    limiter: web::Data<RateLimitService>,
    pool: web::Data<DbPool>,
) -> HttpResponse {
    let address = caller_address(&req);
    let decision = limiter.check_limit(&address).await;

    if !decision.allowed {
        log::warn!(
            "Daily limit reached for {}: {}/{}",
            address,
            decision.count,
            limiter.limit()
        );
        return HttpResponse::TooManyRequests()
            .insert_header(("Retry-After", seconds_until_reset(Utc::now()).to_string()))
            .json(HeartbeatResponse {
                status: "rate_limited",
                count: decision.count,
                limit: limiter.limit(),
            });
    }

    if let Err(e) = db::ping(pool.get_ref()).await {
        log::error!("Heartbeat database check failed: {}", e);
        return HttpResponse::InternalServerError().json(serde_json::json!({ "status": "error" }));
    }

    HttpResponse::Ok().json(HeartbeatResponse {
        status: "ok",
        count: decision.count,
        limit: limiter.limit(),
    })
}

/// Readiness probe, not counted against any budget. 503 without a database.
pub async fn readiness(pool: web::Data<DbPool>) -> HttpResponse {
    let db_healthy = db::ping(pool.get_ref()).await.is_ok();

    let (status, db_status, http_status) = if db_healthy {
        ("ready", "ok", StatusCode::OK)
    } else {
        ("not_ready", "error", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = ReadinessResponse {
        status,
        checks: ReadinessChecks {
            database: db_status,
        },
    };

    HttpResponse::build(http_status).json(response)
}

/// Configures the health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(heartbeat))
            .route("/ready", web::get().to(readiness)),
    );
}
