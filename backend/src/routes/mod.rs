mod docs;
pub mod health;
pub mod todos;

use aide::axum::{
    routing::{get, patch, post},
    ApiRouter,
};
use axum::middleware;

use crate::middleware::auth_middleware;

/// Creates the router with all handler routes
///
/// The API docs are only mounted when `show_api_docs` is set.
pub fn handler(show_api_docs: bool) -> ApiRouter {
    let mut public_routes = ApiRouter::new().api_route("/health", get(health::handler));
    if show_api_docs {
        public_routes = public_routes.merge(docs::handler());
    }

    let protected_routes = ApiRouter::new()
        .api_route("/todos", get(todos::list_todos).post(todos::create_todo))
        .api_route(
            "/todos/{todoId}",
            patch(todos::update_todo).delete(todos::delete_todo),
        )
        .api_route(
            "/todos/{todoId}/attachment",
            post(todos::generate_upload_url),
        )
        .route_layer(middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}
