/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed. The algorithm is pinned on both the
/// signing and the verifying side, and expiry/issuer/subject are checked here
/// rather than left to library defaults, so there is no leeway window.

use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TOKEN_ISSUER};
use crate::error::AppError;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Why an access token was refused.
///
/// Never shown to callers; they only get `AuthError::InvalidCredential`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenRejection {
    Malformed,
    BadSignature,
    WrongAlgorithm,
    Expired,
    WrongIssuer,
    MissingSubject,
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TokenRejection::Malformed => "malformed token",
            TokenRejection::BadSignature => "signature mismatch",
            TokenRejection::WrongAlgorithm => "unexpected signing algorithm",
            TokenRejection::Expired => "token expired",
            TokenRejection::WrongIssuer => "unexpected issuer",
            TokenRejection::MissingSubject => "no subject in token",
        };
        f.write_str(reason)
    }
}

/// Generate a new access token for `subject`
///
/// # Errors
/// Returns an internal error if signing fails
pub fn generate_access_token(
    subject: &str,
    ttl_seconds: i64,
    secret: &[u8],
) -> Result<String, AppError> {
    generate_access_token_at(subject, ttl_seconds, secret, Utc::now().timestamp())
}

/// Same as [`generate_access_token`], issued at `now` (Unix seconds)
pub fn generate_access_token_at(
    subject: &str,
    ttl_seconds: i64,
    secret: &[u8],
    now: i64,
) -> Result<String, AppError> {
    let claims = Claims::new(subject, ttl_seconds, now)?;

    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its subject
///
/// # Errors
/// Returns `AuthError::InvalidCredential` if the token is forged, tampered
/// with, expired, signed with another algorithm, issued by someone else, or
/// has no subject
pub fn validate_access_token(token: &str, secret: &[u8]) -> Result<String, AppError> {
    validate_access_token_at(token, secret, Utc::now().timestamp())
}

/// Same as [`validate_access_token`], judged at `now` (Unix seconds)
pub fn validate_access_token_at(token: &str, secret: &[u8], now: i64) -> Result<String, AppError> {
    decode_claims_at(token, secret, now)
        .map(|claims| claims.sub)
        .map_err(|rejection| {
            tracing::warn!(reason = %rejection, "Access token rejected");
            AppError::invalid_credential()
        })
}

pub(crate) fn decode_claims_at(
    token: &str,
    secret: &[u8],
    now: i64,
) -> Result<Claims, TokenRejection> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenRejection::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenRejection::WrongAlgorithm
            }
            _ => TokenRejection::Malformed,
        })?;

    if claims.is_expired_at(now) {
        return Err(TokenRejection::Expired);
    }
    if claims.iss != TOKEN_ISSUER {
        return Err(TokenRejection::WrongIssuer);
    }
    if claims.sub.is_empty() {
        return Err(TokenRejection::MissingSubject);
    }

    Ok(claims)
}
