use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of the `users` table
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `refresh_tokens` table
///
/// `expires_at` never moves after creation and `revoked_at` is never cleared
/// once set.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    #[inline]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable for renewal: neither revoked nor expired
    #[inline]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_at(expires_at: DateTime<Utc>) -> RefreshToken {
        let created_at = expires_at - Duration::hours(24);
        RefreshToken {
            token: "t".repeat(64),
            user_id: Uuid::new_v4(),
            created_at,
            updated_at: created_at,
            expires_at,
            revoked_at: None,
        }
    }

    #[test]
    fn test_active_until_expiry() {
        let expires_at = Utc::now();
        let token = token_expiring_at(expires_at);

        assert!(token.is_active_at(expires_at - Duration::seconds(1)));
        assert!(token.is_expired_at(expires_at));
        assert!(!token.is_active_at(expires_at));
    }

    #[test]
    fn test_revoked_is_never_active() {
        let expires_at = Utc::now() + Duration::hours(1);
        let mut token = token_expiring_at(expires_at);
        token.revoked_at = Some(Utc::now());

        assert!(token.is_revoked());
        assert!(!token.is_active_at(Utc::now()));
    }
}
