//! JWT-related error types

use thiserror::Error;

/// Errors that can occur while verifying a bearer token
#[derive(Error, Debug)]
pub enum JwtError {
    /// No `Authorization` header was sent
    #[error("No authentication header")]
    MissingAuthorizationHeader,

    /// The header is not of the form `Bearer <token>`
    #[error("Invalid authentication header")]
    InvalidAuthorizationHeader,

    /// Decoding, signature or claim validation failed
    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// No published key matches the token's `kid`
    #[error("No signing key matches the token")]
    UnknownSigningKey,

    /// The JWKS endpoint could not be fetched or parsed
    #[error("Failed to fetch signing keys: {0}")]
    KeySetFetch(#[from] reqwest::Error),

    /// The JWKS endpoint returned no keys
    #[error("Signing key set is empty")]
    KeySetUnavailable,
}
