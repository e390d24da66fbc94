/// Authentication flows
///
/// `AuthService` ties the hasher, the token codec, the credential extractor
/// and the refresh token manager into the operations the HTTP layer exposes:
/// login, renew, revoke-session, plus registration and current-user lookup.
///
/// Every authentication failure leaves as `AuthError::InvalidCredential`
/// (or Missing/Malformed for header problems). The specific reason is only
/// logged.

use std::sync::Arc;

use actix_web::http::header::HeaderMap;
use uuid::Uuid;

use crate::auth::credentials::bearer_token;
use crate::auth::jwt::generate_access_token_at;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::refresh_token::RefreshTokenManager;
use crate::clock::{Clock, SystemClock};
use crate::configuration::JwtSettings;
use crate::error::{AppError, DatabaseError};
use crate::storage::{RefreshToken, RefreshTokenStore, User, UserStore};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful renewal
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: RefreshTokenManager,
    jwt: JwtSettings,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new<S>(store: Arc<S>, jwt: JwtSettings) -> Self
    where
        S: UserStore + RefreshTokenStore + 'static,
    {
        Self::with_clock(store, jwt, Arc::new(SystemClock))
    }

    pub fn with_clock<S>(store: Arc<S>, jwt: JwtSettings, clock: Arc<dyn Clock>) -> Self
    where
        S: UserStore + RefreshTokenStore + 'static,
    {
        Self {
            users: store.clone(),
            refresh_tokens: RefreshTokenManager::new(store, clock.clone()),
            jwt,
            clock,
        }
    }

    pub fn jwt_settings(&self) -> &JwtSettings {
        &self.jwt
    }

    /// Create a user with a freshly hashed password
    ///
    /// # Errors
    /// - `Database(UniqueConstraintViolation)` if the email is taken
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        let hashed_password = hash_password_blocking(password.to_string()).await?;

        let user = self
            .users
            .insert_user(email, &hashed_password)
            .await?
            .ok_or_else(|| {
                AppError::Database(DatabaseError::UniqueConstraintViolation(
                    "Email already registered".to_string(),
                ))
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Authenticate with email and password
    ///
    /// Reuses the user's active refresh token if there is one; otherwise a
    /// new one is issued. An unknown email and a wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = match self.users.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("Login attempt for unknown email");
                return Err(AppError::invalid_credential());
            }
        };

        let verified =
            verify_password_blocking(password.to_string(), user.hashed_password.clone()).await?;
        if !verified {
            tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AppError::invalid_credential());
        }

        let refresh_token = self.active_refresh_token(user.id).await?;
        let access_token = self.mint_access_token(user.id)?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(Session {
            user_id: user.id,
            email: user.email,
            access_token,
            refresh_token: refresh_token.token,
        })
    }

    /// Exchange the refresh token in `Authorization: Bearer` for a new
    /// access token. The refresh token itself is left as it is.
    pub async fn renew(&self, headers: &HeaderMap) -> Result<AccessGrant, AppError> {
        let presented = bearer_token(headers)?;
        let record = self.unrevoked_refresh_token(&presented).await?;

        if record.is_expired_at(self.clock.now()) {
            tracing::warn!(user_id = %record.user_id, "Expired refresh token presented");
            return Err(AppError::invalid_credential());
        }

        let access_token = self.mint_access_token(record.user_id)?;
        tracing::info!(user_id = %record.user_id, "Access token renewed");

        Ok(AccessGrant { access_token })
    }

    /// Revoke the refresh token in `Authorization: Bearer`
    ///
    /// # Errors
    /// - `InvalidCredential` if the token is unknown or already revoked
    /// - `Internal` if the store changed nothing despite the token having
    ///   just been seen unrevoked
    pub async fn revoke_session(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let presented = bearer_token(headers)?;
        let record = self.unrevoked_refresh_token(&presented).await?;

        if !self.refresh_tokens.revoke(&record.token).await? {
            return Err(AppError::Internal(
                "Failed to revoke refresh token".to_string(),
            ));
        }

        tracing::info!(user_id = %record.user_id, "Refresh token revoked");
        Ok(())
    }

    /// Look up the user an access token's subject refers to
    pub async fn user(&self, subject: &str) -> Result<User, AppError> {
        let user_id = Uuid::parse_str(subject).map_err(|_| AppError::invalid_credential())?;

        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(AppError::invalid_credential)
    }

    /// Remove every user and, with them, every refresh token
    pub async fn reset_users(&self) -> Result<u64, AppError> {
        let removed = self.users.delete_all_users().await?;
        tracing::warn!(removed, "All users removed");
        Ok(removed)
    }

    async fn active_refresh_token(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        if let Some(existing) = self.refresh_tokens.find_by_subject(user_id).await? {
            if !existing.is_expired_at(self.clock.now()) {
                return Ok(existing);
            }
            // Expired rows would otherwise hold the one-active-token slot forever.
            tracing::info!(user_id = %user_id, "Retiring expired refresh token");
            self.refresh_tokens.revoke(&existing.token).await?;
        }

        if let Some(issued) = self
            .refresh_tokens
            .issue(user_id, self.jwt.refresh_token_expiry)
            .await?
        {
            return Ok(issued);
        }

        // A concurrent login got there first.
        match self.refresh_tokens.find_by_subject(user_id).await? {
            Some(existing) if existing.is_active_at(self.clock.now()) => Ok(existing),
            _ => Err(AppError::Internal(
                "Failed to create refresh token".to_string(),
            )),
        }
    }

    async fn unrevoked_refresh_token(&self, token: &str) -> Result<RefreshToken, AppError> {
        match self.refresh_tokens.find_by_value(token).await? {
            None => {
                tracing::warn!("Unknown refresh token presented");
                Err(AppError::invalid_credential())
            }
            Some(record) if record.is_revoked() => {
                tracing::warn!(user_id = %record.user_id, "Revoked refresh token presented");
                Err(AppError::invalid_credential())
            }
            Some(record) => Ok(record),
        }
    }

    fn mint_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        generate_access_token_at(
            &user_id.to_string(),
            self.jwt.access_token_expiry,
            self.jwt.secret_bytes(),
            self.clock.unix_timestamp(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_access_token_at;
    use crate::auth::password::hash_password;
    use crate::clock::testing::FixedClock;
    use crate::error::AuthError;
    use crate::storage::InMemoryStore;
    use actix_web::http::header::{HeaderValue, AUTHORIZATION};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    const EMAIL: &str = "walt@breakingbad.com";
    const PASSWORD: &str = "123456";
    const SECRET: &str = "test-secret";

    struct Harness {
        service: AuthService,
        store: Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
        user: User,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let user = store
            .insert_user(EMAIL, &hash_password(PASSWORD).unwrap())
            .await
            .unwrap()
            .unwrap();
        let service = AuthService::with_clock(store.clone(), JwtSettings::new(SECRET), clock.clone());

        Harness { service, store, clock, user }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn kind<T: std::fmt::Debug>(result: Result<T, AppError>) -> Option<AuthError> {
        result.unwrap_err().auth_kind()
    }

    #[tokio::test]
    async fn test_login_issues_both_tokens() {
        let h = harness().await;

        let session = h.service.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(session.user_id, h.user.id);
        assert_eq!(session.email, EMAIL);
        assert!(!session.access_token.is_empty());
        assert!(!session.refresh_token.is_empty());
        assert_ne!(session.access_token, session.refresh_token);

        let subject =
            validate_access_token_at(&session.access_token, SECRET.as_bytes(), h.clock.unix_timestamp())
                .unwrap();
        assert_eq!(subject, h.user.id.to_string());
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let h = harness().await;

        let unknown = h.service.login("nobody@example.com", PASSWORD).await.unwrap_err();
        let wrong = h.service.login(EMAIL, "wrong-password").await.unwrap_err();

        assert_eq!(unknown.auth_kind(), Some(AuthError::InvalidCredential));
        assert_eq!(wrong.auth_kind(), Some(AuthError::InvalidCredential));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_failed_login_issues_nothing() {
        let h = harness().await;

        assert!(h.service.login(EMAIL, "wrong-password").await.is_err());
        assert_eq!(h.store.refresh_token_count(h.user.id), 0);
    }

    #[tokio::test]
    async fn test_repeated_login_reuses_refresh_token() {
        let h = harness().await;

        let first = h.service.login(EMAIL, PASSWORD).await.unwrap();
        let second = h.service.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(first.refresh_token, second.refresh_token);
        assert_eq!(h.store.refresh_token_count(h.user.id), 1);
    }

    #[tokio::test]
    async fn test_login_replaces_expired_refresh_token() {
        let h = harness().await;
        let first = h.service.login(EMAIL, PASSWORD).await.unwrap();

        h.clock.advance(86_400);
        let second = h.service.login(EMAIL, PASSWORD).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        let old = h.store.select_refresh_token(&first.refresh_token).await.unwrap().unwrap();
        assert!(old.is_revoked());
    }

    #[tokio::test]
    async fn test_renew_mints_new_access_token() {
        let h = harness().await;
        let session = h.service.login(EMAIL, PASSWORD).await.unwrap();
        let before = h.store.select_refresh_token(&session.refresh_token).await.unwrap().unwrap();

        h.clock.advance(30);
        let grant = h.service.renew(&bearer(&session.refresh_token)).await.unwrap();

        assert_ne!(grant.access_token, session.access_token);
        let subject =
            validate_access_token_at(&grant.access_token, SECRET.as_bytes(), h.clock.unix_timestamp())
                .unwrap();
        assert_eq!(subject, h.user.id.to_string());

        // No rotation and no extension
        let after = h.store.select_refresh_token(&session.refresh_token).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_renew_rejects_bad_headers() {
        let h = harness().await;

        assert_eq!(kind(h.service.renew(&HeaderMap::new()).await), Some(AuthError::MissingCredential));

        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(kind(h.service.renew(&basic).await), Some(AuthError::MalformedCredential));

        assert_eq!(
            kind(h.service.renew(&bearer("not-a-refresh-token")).await),
            Some(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_renew_rejects_expired_refresh_token() {
        let h = harness().await;
        let session = h.service.login(EMAIL, PASSWORD).await.unwrap();

        h.clock.advance(86_400);

        assert_eq!(
            kind(h.service.renew(&bearer(&session.refresh_token)).await),
            Some(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_revoke_then_renew_fails() {
        let h = harness().await;
        let session = h.service.login(EMAIL, PASSWORD).await.unwrap();
        let headers = bearer(&session.refresh_token);

        h.service.revoke_session(&headers).await.unwrap();

        assert_eq!(kind(h.service.renew(&headers).await), Some(AuthError::InvalidCredential));
        assert_eq!(
            kind(h.service.revoke_session(&headers).await),
            Some(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_login_after_revoke_issues_new_token() {
        let h = harness().await;
        let first = h.service.login(EMAIL, PASSWORD).await.unwrap();
        h.service.revoke_session(&bearer(&first.refresh_token)).await.unwrap();

        let second = h.service.login(EMAIL, PASSWORD).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(h.service.renew(&bearer(&second.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let h = harness().await;
        assert_eq!(
            kind(h.service.revoke_session(&bearer("nope")).await),
            Some(AuthError::InvalidCredential)
        );
    }

    /// Store whose revocation never lands, as if another request won the race
    struct LosingRevokeStore(InMemoryStore);

    #[async_trait]
    impl UserStore for LosingRevokeStore {
        async fn insert_user(&self, email: &str, hashed_password: &str) -> Result<Option<User>, AppError> {
            self.0.insert_user(email, hashed_password).await
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
            self.0.find_user_by_email(email).await
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
            self.0.find_user_by_id(id).await
        }

        async fn delete_all_users(&self) -> Result<u64, AppError> {
            self.0.delete_all_users().await
        }
    }

    #[async_trait]
    impl RefreshTokenStore for LosingRevokeStore {
        async fn insert_refresh_token(
            &self,
            token: &str,
            user_id: Uuid,
            created_at: DateTime<Utc>,
            expires_at: DateTime<Utc>,
        ) -> Result<Option<RefreshToken>, AppError> {
            self.0.insert_refresh_token(token, user_id, created_at, expires_at).await
        }

        async fn select_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
            self.0.select_refresh_token(token).await
        }

        async fn select_active_refresh_token(&self, user_id: Uuid) -> Result<Option<RefreshToken>, AppError> {
            self.0.select_active_refresh_token(user_id).await
        }

        async fn update_refresh_token_revoked_at(
            &self,
            _token: &str,
            _revoked_at: DateTime<Utc>,
        ) -> Result<u64, AppError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_revoke_reports_internal_fault_when_nothing_changes() {
        let store = Arc::new(LosingRevokeStore(InMemoryStore::new()));
        store.insert_user(EMAIL, &hash_password(PASSWORD).unwrap()).await.unwrap();
        let service = AuthService::new(store, JwtSettings::new(SECRET));

        let session = service.login(EMAIL, PASSWORD).await.unwrap();
        let err = service.revoke_session(&bearer(&session.refresh_token)).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let h = harness().await;

        let user = h.service.register("new@example.com", "hunter2").await.unwrap();
        assert_ne!(user.hashed_password, "hunter2");
        assert!(h.service.login("new@example.com", "hunter2").await.is_ok());

        let found = h.service.user(&user.id.to_string()).await.unwrap();
        assert_eq!(found.email, "new@example.com");

        assert_eq!(kind(h.service.user("not-a-uuid").await), Some(AuthError::InvalidCredential));
        assert_eq!(
            kind(h.service.user(&Uuid::new_v4().to_string()).await),
            Some(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_refresh_ttl_fails_cleanly() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_user(EMAIL, &hash_password(PASSWORD).unwrap()).await.unwrap();
        let mut jwt = JwtSettings::new(SECRET);
        jwt.refresh_token_expiry = i64::MAX / 2;
        let service = AuthService::new(store, jwt);

        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_login_with_out_of_range_access_ttl_fails_cleanly() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_user(EMAIL, &hash_password(PASSWORD).unwrap()).await.unwrap();
        let mut jwt = JwtSettings::new(SECRET);
        jwt.access_token_expiry = i64::MAX;
        let service = AuthService::new(store, jwt);

        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_reset_users_ends_every_session() {
        let h = harness().await;
        let session = h.service.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(h.service.reset_users().await.unwrap(), 1);

        assert_eq!(
            kind(h.service.login(EMAIL, PASSWORD).await),
            Some(AuthError::InvalidCredential)
        );
        assert_eq!(
            kind(h.service.renew(&bearer(&session.refresh_token)).await),
            Some(AuthError::InvalidCredential)
        );
        assert_eq!(h.store.refresh_token_count(h.user.id), 0);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let h = harness().await;

        let err = h.service.register(EMAIL, "whatever").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Database(DatabaseError::UniqueConstraintViolation(_))
        ));
    }
}
