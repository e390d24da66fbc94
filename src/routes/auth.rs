/// Authentication Routes
///
/// Login, access token renewal, and refresh token revocation. Handlers only
/// translate between HTTP and `AuthService`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::error::AppError;
use crate::validators::require_field;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login response with access and refresh tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Renewal response
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// POST /api/login
///
/// Authenticate with email and password.
///
/// # Errors
/// - 400: Missing email or password
/// - 401: Invalid credentials (unknown email or wrong password, same message)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    require_field(&form.email, "email")?;
    require_field(&form.password, "password")?;

    let session = auth.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: session.user_id.to_string(),
        email: session.email,
        access_token: session.access_token,
        refresh_token: session.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.jwt_settings().access_token_expiry,
    }))
}

/// POST /api/refresh
///
/// Exchange a refresh token (`Authorization: Bearer <refresh_token>`) for a
/// new access token. The refresh token is not rotated.
///
/// # Errors
/// - 401: Missing, malformed, unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let grant = auth.renew(req.headers()).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token: grant.access_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.jwt_settings().access_token_expiry,
    }))
}

/// POST /api/revoke
///
/// Revoke a refresh token (`Authorization: Bearer <refresh_token>`).
///
/// # Errors
/// - 401: Missing, malformed, unknown or already revoked refresh token
/// - 500: The token could not be revoked
pub async fn revoke(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.revoke_session(req.headers()).await?;

    Ok(HttpResponse::NoContent().finish())
}
