/// In-process storage
///
/// Mirrors the Postgres semantics, including the unique email and the one
/// active refresh token per user, so the auth flows behave the same way
/// without a database. Each operation holds the lock for its whole duration,
/// which gives it the single-statement atomicity the Postgres store has.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{RefreshToken, User};
use super::{RefreshTokenStore, UserStore};
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables()?;

        if tables.users.values().any(|user| user.email == email) {
            return Ok(None);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(Some(user))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables()?;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables()?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn delete_all_users(&self) -> Result<u64, AppError> {
        let mut tables = self.tables()?;

        let removed = tables.users.len() as u64;
        tables.users.clear();
        tables.refresh_tokens.clear();

        Ok(removed)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, AppError> {
        let mut tables = self.tables()?;

        let has_active = tables
            .refresh_tokens
            .values()
            .any(|row| row.user_id == user_id && !row.is_revoked());
        if has_active || tables.refresh_tokens.contains_key(token) {
            return Ok(None);
        }

        let row = RefreshToken {
            token: token.to_string(),
            user_id,
            created_at,
            updated_at: created_at,
            expires_at,
            revoked_at: None,
        };
        tables.refresh_tokens.insert(row.token.clone(), row.clone());

        Ok(Some(row))
    }

    async fn select_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let tables = self.tables()?;
        Ok(tables.refresh_tokens.get(token).cloned())
    }

    async fn select_active_refresh_token(
        &self,
        user_id: Uuid,
    ) -> Result<Option<RefreshToken>, AppError> {
        let tables = self.tables()?;
        Ok(tables
            .refresh_tokens
            .values()
            .filter(|row| row.user_id == user_id && !row.is_revoked())
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn update_refresh_token_revoked_at(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tables = self.tables()?;

        match tables.refresh_tokens.get_mut(token) {
            Some(row) if row.revoked_at.is_none() => {
                row.revoked_at = Some(revoked_at);
                row.updated_at = revoked_at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
impl InMemoryStore {
    /// Number of refresh token rows ever inserted for `user_id`
    pub(crate) fn refresh_token_count(&self, user_id: Uuid) -> usize {
        self.tables()
            .map(|tables| {
                tables
                    .refresh_tokens
                    .values()
                    .filter(|row| row.user_id == user_id)
                    .count()
            })
            .unwrap_or(0)
    }
}
