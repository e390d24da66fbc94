/// Password Hashing and Verification
///
/// Argon2id with a random per-call salt, stored as a PHC string. Hashing is
/// CPU-heavy, so request handlers go through the `*_blocking`
/// variants which move the work onto tokio's blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::AppError;

/// Hash a password using Argon2id
///
/// Any string is accepted, including the empty string; strength rules live
/// in `validators`.
///
/// # Errors
/// Returns an internal error if the hashing library fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash
///
/// A hash this module could not have produced simply fails verification.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    let parsed = match PasswordHash::new(hashed_password) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be parsed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking thread pool
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// [`verify_password`] on the blocking thread pool
///
/// # Errors
/// Only fails if the worker itself panics or is cancelled
pub async fn verify_password_blocking(
    password: String,
    hashed_password: String,
) -> Result<bool, AppError> {
    let verified =
        tokio::task::spawn_blocking(move || verify_password(&password, &hashed_password)).await?;
    Ok(verified)
}
