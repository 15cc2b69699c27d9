use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::config::AdminConfig;
use crate::error::AppError;

/// Extractor guarding administrative endpoints with a shared Bearer token
///
/// When no admin token is configured the guard lets every request through.
///
/// ```ignore
/// async fn trigger(_admin: AdminAuth) -> HttpResponse { ... }
/// ```
pub struct AdminAuth;

impl FromRequest for AdminAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(admin) = req.app_data::<web::Data<AdminConfig>>() else {
            return ready(Err(AppError::Internal(
                "Admin configuration not registered".to_string(),
            )));
        };

        let Some(expected) = admin.token.as_deref() else {
            return ready(Ok(AdminAuth));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(check_bearer(header, expected).map(|_| AdminAuth))
    }
}

fn check_bearer(header: Option<&str>, expected: &str) -> Result<(), AppError> {
    let header =
        header.ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized(
            "Invalid Authorization header format, expected 'Bearer <token>'".to_string(),
        )
    })?;

    if token.trim() != expected {
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(())
}
