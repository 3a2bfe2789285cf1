use std::sync::Arc;
use std::time::Duration;

use aide::openapi::OpenApi;
use anyhow::Context;
use axum::{
    http::{header, Method},
    Extension, Router,
};
use todo_storage::TodoRepository;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::routes;
use crate::{attachment_storage::AttachmentStorage, jwt::JwtVerifier, types::Environment};

/// Request timeout, kept below the API Gateway integration timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the token verifier for `environment`
///
/// # Errors
///
/// Returns an error if `AUTH0_JWKS_URL` is not set while auth is enabled
pub fn jwt_verifier(environment: &Environment) -> anyhow::Result<JwtVerifier> {
    let audience = environment.jwt_audience();
    let issuer = environment.jwt_issuer();

    match environment.jwks_url() {
        Some(url) => Ok(JwtVerifier::new(
            url,
            audience.as_deref(),
            issuer.as_deref(),
        )?),
        None if environment.disable_auth() => {
            tracing::warn!("⚠️ Auth is disabled, bearer tokens are trusted as user IDs");
            Ok(JwtVerifier::with_key_set(
                jsonwebtoken::jwk::JwkSet { keys: Vec::new() },
                None,
                None,
            ))
        }
        None => anyhow::bail!("AUTH0_JWKS_URL environment variable is not set"),
    }
}

/// Assembles the application router with its shared dependencies
pub fn build_router(
    environment: Environment,
    todo_repository: Arc<dyn TodoRepository>,
    attachment_storage: Arc<AttachmentStorage>,
    jwt_verifier: Arc<JwtVerifier>,
) -> Router {
    let mut openapi = OpenApi::default();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    routes::handler(environment.show_api_docs())
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(todo_repository))
        .layer(Extension(attachment_storage))
        .layer(Extension(jwt_verifier))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Starts the server with the given environment and dependencies
///
/// Runs behind API Gateway when started by the Lambda runtime, otherwise binds
/// a local listener on `PORT` (default 8001).
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    todo_repository: Arc<dyn TodoRepository>,
    attachment_storage: Arc<AttachmentStorage>,
    jwt_verifier: Arc<JwtVerifier>,
) -> anyhow::Result<()> {
    let router = build_router(
        environment,
        todo_repository,
        attachment_storage,
        jwt_verifier,
    );

    if Environment::running_on_lambda() {
        tracing::info!("🔄 Todo backend started on AWS Lambda");
        return lambda_http::run(router)
            .await
            .map_err(|e| anyhow::anyhow!(e));
    }

    let port = std::env::var("PORT").map_or(Ok(8001), |p| p.parse::<u16>())?;
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("🔄 Todo backend started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}
