/// JWT Claims structure
///
/// The payload of an access token: who it is for, who issued it, and the
/// window during which it is valid (RFC 7519 registered claims).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Fixed issuer for every token this service mints
pub const TOKEN_ISSUER: &str = "chirpy";

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Subject (user ID)
    #[serde(default)]
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token ID
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    /// Create claims for `subject`, valid from `now` for `ttl_seconds`
    ///
    /// # Errors
    /// Returns an internal error if `now + ttl_seconds` overflows
    pub fn new(subject: &str, ttl_seconds: i64, now: i64) -> Result<Self, AppError> {
        let exp = now.checked_add(ttl_seconds).ok_or_else(|| {
            AppError::Internal(format!("Access token lifetime out of range: {}", ttl_seconds))
        })?;

        Ok(Self {
            iss: TOKEN_ISSUER.to_string(),
            sub: subject.to_string(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        })
    }

    /// A token is expired from the second `exp` is reached
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}
