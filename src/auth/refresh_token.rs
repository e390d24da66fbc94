/// Refresh Token Management
///
/// Refresh tokens are:
/// - Cryptographically secure random 64-character strings
/// - Opaque to clients and keyed by their value in storage
/// - Limited to one active (unrevoked) token per user
/// - Revocable exactly once; a revoked token stays revoked
///
/// They are not rotated on use.

use std::sync::Arc;

use chrono::Duration;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::storage::{RefreshToken, RefreshTokenStore};

const REFRESH_TOKEN_LENGTH: usize = 64;

/// Generate a new cryptographically secure refresh token
///
/// 64 characters drawn from [A-Za-z0-9], roughly 380 bits of entropy.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn RefreshTokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Issue and persist a new refresh token for `user_id`
    ///
    /// # Returns
    /// `None` if the store refused the row because of a unique conflict,
    /// either a colliding token value or another active token for the
    /// same user. Callers should treat that as transient.
    ///
    /// # Errors
    /// Returns an internal error if `ttl_seconds` cannot be added to the
    /// current time, or an error if the database operation fails
    pub async fn issue(
        &self,
        user_id: Uuid,
        ttl_seconds: i64,
    ) -> Result<Option<RefreshToken>, AppError> {
        let token = generate_refresh_token();
        let created_at = self.clock.now();
        let expires_at = Duration::try_seconds(ttl_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Internal(format!("Refresh token lifetime out of range: {}", ttl_seconds))
            })?;

        let row = self
            .store
            .insert_refresh_token(&token, user_id, created_at, expires_at)
            .await?;

        match &row {
            Some(_) => tracing::debug!(user_id = %user_id, "Refresh token issued"),
            None => tracing::warn!(user_id = %user_id, "Refresh token insert hit a unique conflict"),
        }

        Ok(row)
    }

    /// The most recent unrevoked token for `user_id`, if any
    ///
    /// Expiry is not filtered here; see [`RefreshToken::is_active_at`].
    pub async fn find_by_subject(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError> {
        self.store.select_active_refresh_token(user_id).await
    }

    /// Exact lookup by token value
    pub async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        self.store.select_refresh_token(token).await
    }

    /// Revoke a single refresh token
    ///
    /// # Returns
    /// `true` if a row went from active to revoked. Revoking an unknown or
    /// already revoked token returns `false` and leaves the original
    /// `revoked_at` untouched.
    ///
    /// # Errors
    /// Returns error if the database operation fails
    pub async fn revoke(&self, token: &str) -> Result<bool, AppError> {
        let rows = self
            .store
            .update_refresh_token_revoked_at(token, self.clock.now())
            .await?;

        Ok(rows > 0)
    }
}
