/// Persistence contracts
///
/// The auth core only needs two narrow capabilities from storage: finding
/// users, and keeping refresh tokens. Both are traits so the service can run
/// against Postgres in production and an in-memory store in tests.

mod memory;
mod models;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;

pub use memory::InMemoryStore;
pub use models::{RefreshToken, User};
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; `None` if the email is already taken
    async fn insert_user(&self, email: &str, hashed_password: &str)
        -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Delete every user along with their refresh tokens; returns the
    /// number of users removed
    async fn delete_all_users(&self) -> Result<u64, AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert a token row; `None` on any unique conflict, either on the token
    /// value or on the one-active-token-per-user constraint
    async fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError>;

    /// Exact match on the token value, revoked or not
    async fn select_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Most recent unrevoked token for a user
    async fn select_active_refresh_token(
        &self,
        user_id: Uuid,
    ) -> Result<Option<RefreshToken>, AppError>;

    /// Set `revoked_at` if it is still unset; returns the number of rows changed
    async fn update_refresh_token_revoked_at(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, AppError>;
}
