/// User Routes
///
/// Registration and the authenticated user's own record.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::error::AppError;
use crate::middleware::AuthenticatedSubject;
use crate::storage::User;
use crate::validators::{is_valid_email, is_valid_password};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// User information response; never includes the password hash
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email or missing/oversized password
/// - 409: Email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    is_valid_password(&form.password)?;

    let user = auth.register(&email, &form.password).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// GET /api/users/me
///
/// **Requires a valid access token**: `Authorization: Bearer <access_token>`
pub async fn get_current_user(
    subject: web::ReqData<AuthenticatedSubject>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = auth.user(&subject.0).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
