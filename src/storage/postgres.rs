/// Postgres-backed storage
///
/// Schema lives in `migrations/`. The partial unique index on
/// `refresh_tokens (user_id) WHERE revoked_at IS NULL` is what keeps a user
/// down to a single active refresh token; inserts that would break it come
/// back empty through `ON CONFLICT DO NOTHING`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{RefreshToken, User};
use super::{RefreshTokenStore, UserStore};
use crate::error::AppError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, hashed_password, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn delete_all_users(&self) -> Result<u64, AppError> {
        // refresh_tokens rows go with their user (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $3, $4)
            ON CONFLICT DO NOTHING
            RETURNING token, user_id, created_at, updated_at, expires_at, revoked_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(created_at)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn select_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn select_active_refresh_token(
        &self,
        user_id: Uuid,
    ) -> Result<Option<RefreshToken>, AppError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE user_id = $1 AND revoked_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_refresh_token_revoked_at(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE token = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(revoked_at)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
