use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::{routing::get, Extension, Json};

/// Scalar UI at `/docs` over the generated document at `/openapi.json`
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .route(
            "/docs",
            Scalar::new("/openapi.json")
                .with_title("Todo Backend API")
                .axum_route(),
        )
        .route("/openapi.json", get(openapi_document))
}

#[allow(clippy::unused_async)]
async fn openapi_document(Extension(openapi): Extension<OpenApi>) -> Json<OpenApi> {
    Json(openapi)
}
