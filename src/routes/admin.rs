/// Admin Routes
///
/// Development-only maintenance endpoints.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::AuthService;
use crate::configuration::Platform;
use crate::error::AppError;

#[derive(Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub removed: u64,
}

/// POST /admin/reset
///
/// Delete every user and their refresh tokens.
///
/// # Errors
/// - 403: Not running with `APP_PLATFORM=DEV`
pub async fn reset(
    platform: web::Data<Platform>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    if !platform.is_dev() {
        return Err(AppError::Forbidden(
            "Admin reset is only allowed in development mode".to_string(),
        ));
    }

    let removed = auth.reset_users().await?;

    Ok(HttpResponse::Ok().json(ResetResponse {
        message: "All users removed successfully".to_string(),
        removed,
    }))
}
