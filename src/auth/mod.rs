/// Authentication module
///
/// Password hashing, access token signing/validation, authorization header
/// parsing, refresh token management, and the flows built on top of them.

mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::{Claims, TOKEN_ISSUER};
pub use credentials::{api_key, bearer_token, API_KEY_SCHEME, BEARER_SCHEME};
pub use jwt::{
    generate_access_token, generate_access_token_at, validate_access_token,
    validate_access_token_at,
};
pub use password::{hash_password, hash_password_blocking, verify_password, verify_password_blocking};
pub use refresh_token::{generate_refresh_token, RefreshTokenManager};
pub use service::{AccessGrant, AuthService, Session};
