//! Todo backend service

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

/// S3 attachment storage
pub mod attachment_storage;

/// API Gateway custom authorizer
pub mod authorizer;

/// Bearer token verification against the identity provider's JWKS
pub mod jwt;

/// Tracing subscriber setup
pub mod logging;

/// Request middleware
pub mod middleware;

/// HTTP routes
pub mod routes;

/// Router assembly and runtime selection
pub mod server;

/// Shared types: configuration, errors, extractors
pub mod types;
