//! Bearer token verification for tokens issued by the identity provider (Auth0).
//!
//! Tokens are RS256-signed JWTs. The public keys are published as a JSON Web Key Set
//! and cached in memory. A token whose `kid` is not cached triggers one refetch, at most
//! once per [`MIN_REFRESH_INTERVAL`], so key rotation on the provider side is picked up
//! without a redeploy.

mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_keys;

use std::time::{Duration, Instant};

use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub use error::JwtError;

/// Minimum time between two JWKS fetches
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// JWKS fetch timeout
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Claims the backend reads from a verified token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject, used as the user ID
    pub sub: String,
    /// Expiration (seconds since epoch)
    pub exp: u64,
    /// Issued at (seconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

#[derive(Debug)]
struct KeyCache {
    keys: JwkSet,
    fetched_at: Option<Instant>,
}

/// Verifies RS256 bearer tokens against a JSON Web Key Set
#[derive(Debug)]
pub struct JwtVerifier {
    http_client: reqwest::Client,
    jwks_url: Option<String>,
    cache: RwLock<KeyCache>,
    validation: Validation,
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively.
///
/// # Errors
///
/// - `JwtError::MissingAuthorizationHeader` - header absent or blank
/// - `JwtError::InvalidAuthorizationHeader` - not a bearer header, or empty token
pub fn bearer_token(header: Option<&str>) -> Result<&str, JwtError> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(JwtError::MissingAuthorizationHeader)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(JwtError::InvalidAuthorizationHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(JwtError::InvalidAuthorizationHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(JwtError::InvalidAuthorizationHeader);
    }

    Ok(token)
}

impl JwtVerifier {
    /// Creates a verifier that lazily fetches keys from `jwks_url`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::KeySetFetch` if the HTTP client cannot be built
    pub fn new(
        jwks_url: String,
        audience: Option<&str>,
        issuer: Option<&str>,
    ) -> Result<Self, JwtError> {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            jwks_url: Some(jwks_url),
            cache: RwLock::new(KeyCache {
                keys: JwkSet { keys: Vec::new() },
                fetched_at: None,
            }),
            validation: Self::validation(audience, issuer),
        })
    }

    /// Creates a verifier over a fixed key set that is never refetched
    #[must_use]
    pub fn with_key_set(keys: JwkSet, audience: Option<&str>, issuer: Option<&str>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            jwks_url: None,
            cache: RwLock::new(KeyCache {
                keys,
                fetched_at: None,
            }),
            validation: Self::validation(audience, issuer),
        }
    }

    fn validation(audience: Option<&str>, issuer: Option<&str>) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        validation
    }

    /// Verifies the token carried by an `Authorization` header value
    ///
    /// # Errors
    ///
    /// See [`bearer_token`] and [`Self::verify`]
    pub async fn verify_authorization_header(
        &self,
        header: Option<&str>,
    ) -> Result<JwtClaims, JwtError> {
        let token = bearer_token(header)?;
        self.verify(token).await
    }

    /// Verifies the signature and standard claims of `token`
    ///
    /// # Errors
    ///
    /// - `JwtError::InvalidToken` - malformed token, bad signature, wrong algorithm,
    ///   expired, or audience/issuer mismatch
    /// - `JwtError::UnknownSigningKey` - no published key matches the token
    /// - `JwtError::KeySetFetch` / `JwtError::KeySetUnavailable` - keys could not be loaded
    pub async fn verify(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let header = decode_header(token)?;
        let key = self.decoding_key(header.kid.as_deref()).await?;
        let data = decode::<JwtClaims>(token, &key, &self.validation)?;
        Ok(data.claims)
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwtError> {
        if let Some(key) = select_key(&self.cache.read().await.keys, kid)? {
            return Ok(key);
        }

        if self.jwks_url.is_none() {
            return Err(JwtError::UnknownSigningKey);
        }

        self.refresh_keys().await?;

        select_key(&self.cache.read().await.keys, kid)?.ok_or(JwtError::UnknownSigningKey)
    }

    /// Refetches the key set unless it was fetched within [`MIN_REFRESH_INTERVAL`]
    async fn refresh_keys(&self) -> Result<(), JwtError> {
        let Some(url) = self.jwks_url.as_deref() else {
            return Ok(());
        };

        let mut cache = self.cache.write().await;
        if cache
            .fetched_at
            .is_some_and(|at| at.elapsed() < MIN_REFRESH_INTERVAL)
        {
            return Ok(());
        }

        tracing::info!("Fetching signing keys from {url}");

        let keys: JwkSet = self
            .http_client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        cache.fetched_at = Some(Instant::now());

        if keys.keys.is_empty() {
            return Err(JwtError::KeySetUnavailable);
        }

        tracing::info!("Loaded {} signing keys", keys.keys.len());
        cache.keys = keys;

        Ok(())
    }
}

/// Picks the key for `kid`, or the only key when the token names none
fn select_key(keys: &JwkSet, kid: Option<&str>) -> Result<Option<DecodingKey>, JwtError> {
    let jwk = match kid {
        Some(kid) => keys.find(kid),
        None => match keys.keys.as_slice() {
            [only] => Some(only),
            _ => None,
        },
    };

    Ok(jwk.map(DecodingKey::from_jwk).transpose()?)
}
