/// Authorization header parsing
///
/// Pulls `Authorization: <Scheme> <value>` apart. Only the shape is checked
/// here; whether the value is any good is for the token codec or the
/// refresh token store to decide.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::{AppError, AuthError};

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Extract the token from `Authorization: Bearer <token>`
///
/// # Errors
/// - `MissingCredential` if there is no Authorization header
/// - `MalformedCredential` if the scheme is not exactly `Bearer` or the
///   value is not a single token
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    credential_for_scheme(headers, BEARER_SCHEME)
}

/// Extract the key from `Authorization: ApiKey <key>`
///
/// Same failure modes as [`bearer_token`].
pub fn api_key(headers: &HeaderMap) -> Result<String, AppError> {
    credential_for_scheme(headers, API_KEY_SCHEME)
}

fn credential_for_scheme(headers: &HeaderMap, scheme: &str) -> Result<String, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    let value = header.to_str().map_err(|_| {
        tracing::debug!("Authorization header is not valid ASCII");
        AuthError::MalformedCredential
    })?;

    parse_authorization(value, scheme).map_err(AppError::from)
}

fn parse_authorization(value: &str, scheme: &str) -> Result<String, AuthError> {
    let mut parts = value.split_whitespace();

    let (found_scheme, credential) = match (parts.next(), parts.next(), parts.next()) {
        (Some(found_scheme), Some(credential), None) => (found_scheme, credential),
        _ => {
            tracing::debug!(expected = scheme, "Authorization header is not `<scheme> <value>`");
            return Err(AuthError::MalformedCredential);
        }
    };

    if found_scheme != scheme {
        tracing::debug!(expected = scheme, found = found_scheme, "Unexpected authorization scheme");
        return Err(AuthError::MalformedCredential);
    }

    Ok(credential.to_string())
}
