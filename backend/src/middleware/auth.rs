use std::sync::Arc;

use aide::OperationIo;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::{
    jwt::{bearer_token, JwtClaims, JwtVerifier},
    types::{AppError, Environment},
};

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone, PartialEq, Eq, OperationIo)]
pub struct AuthenticatedUser {
    /// The token subject, which owns todo items
    pub user_id: String,
}

impl From<JwtClaims> for AuthenticatedUser {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
        }
    }
}

/// Axum extractor for the authenticated user
///
/// Only resolves on routes wrapped by [`auth_middleware`]:
/// ```ignore
/// async fn protected_handler(
///     user: AuthenticatedUser,
/// ) -> Result<impl IntoResponse, AppError> {
///     Ok(user.user_id)
/// }
/// ```
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            AppError::new(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authentication required but user not found in request extensions",
                false,
            )
        })
    }
}

/// JWT authentication middleware
///
/// Verifies the bearer token with [`JwtVerifier`] and adds the
/// [`AuthenticatedUser`] to the request extensions.
///
/// With `DISABLE_AUTH` in development the token is not verified and is used
/// as the user ID as is. The header must still carry a bearer token.
///
/// # Errors
///
/// - `AppError` 401 - missing, malformed, invalid or expired token
/// - `AppError` 503 - signing keys could not be loaded
pub async fn auth_middleware(
    Extension(verifier): Extension<Arc<JwtVerifier>>,
    Extension(environment): Extension<Environment>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    if environment.disable_auth() {
        let user = AuthenticatedUser {
            user_id: bearer_token(auth_header)?.to_string(),
        };
        request.extensions_mut().insert(user);

        return Ok(next.run(request).await);
    }

    let claims = verifier.verify_authorization_header(auth_header).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}
