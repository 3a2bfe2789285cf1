//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use todo_storage::TodoStorageError;

use crate::{attachment_storage::BucketError, jwt::JwtError};

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// The todo does not exist
    #[must_use]
    pub const fn todo_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "todo_not_found",
            "Todo item not found",
            false,
        )
    }

    /// The todo belongs to another user
    #[must_use]
    pub const fn forbidden() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "forbidden",
            "User is not authorized to access this todo item",
            false,
        )
    }

    /// Request body failed validation
    #[must_use]
    pub const fn validation_error() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "Request validation failed",
            false,
        )
    }

    const fn internal(retry: bool) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
            retry,
        )
    }

    /// HTTP status of this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code of this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

impl From<TodoStorageError> for AppError {
    fn from(err: TodoStorageError) -> Self {
        match &err {
            TodoStorageError::TodoNotFound(id) => {
                tracing::debug!("Todo disappeared before write: {id}");
                Self::todo_not_found()
            }
            TodoStorageError::TodoExists(id) => {
                tracing::error!("Generated todo ID collided: {id}");
                Self::new(
                    StatusCode::CONFLICT,
                    "already_exists",
                    "Todo item already exists",
                    true,
                )
            }
            TodoStorageError::SerializationError(msg) => {
                tracing::error!("Todo serialization error: {msg}");
                Self::internal(false)
            }
            _ => {
                tracing::error!("DynamoDB error: {err}");
                Self::internal(true)
            }
        }
    }
}

impl From<BucketError> for AppError {
    fn from(err: BucketError) -> Self {
        match &err {
            BucketError::ConfigError(msg) => {
                tracing::error!("Configuration error: {msg}");
                Self::internal(false)
            }
            BucketError::S3Error(msg) => {
                tracing::error!("S3 error: {msg}");
                Self::internal(true)
            }
        }
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match &err {
            JwtError::MissingAuthorizationHeader | JwtError::InvalidAuthorizationHeader => {
                Self::new(
                    StatusCode::UNAUTHORIZED,
                    "missing_token",
                    "Authorization header must contain a valid Bearer token",
                    false,
                )
            }
            JwtError::KeySetFetch(_) | JwtError::KeySetUnavailable => {
                tracing::error!("Signing keys unavailable: {err}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_error",
                    "Identity provider temporarily unavailable",
                    true,
                )
            }
            JwtError::InvalidToken(_) | JwtError::UnknownSigningKey => {
                tracing::debug!("Token rejected: {err}");
                Self::new(
                    StatusCode::UNAUTHORIZED,
                    "invalid_token",
                    "Invalid or expired token",
                    false,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
