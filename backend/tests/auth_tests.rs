mod common;

use axum::http::StatusCode;
use backend::{
    jwt::test_keys::{claims_for, sign_token, OTHER_PRIVATE_KEY_PEM, TEST_KID},
    types::Environment,
};
use common::*;
use serde_json::json;

async fn list_with(setup: &TestSetup, auth: Option<&str>) -> (StatusCode, serde_json::Value) {
    let response = setup.send_get_request("/todos", auth).await.unwrap();
    let status = response.status();
    (status, setup.parse_response_body(response).await.unwrap())
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let setup = TestSetup::new();

    let (status, body) = list_with(&setup, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "missing_token");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let setup = TestSetup::new();

    let (status, body) = list_with(&setup, Some("Basic dXNlcjpwYXNz")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "missing_token");
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let setup = TestSetup::new();
    let forged = sign_token(&claims_for("auth0|alice"), Some(TEST_KID), OTHER_PRIVATE_KEY_PEM);

    let (status, body) = list_with(&setup, Some(&format!("Bearer {forged}"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let setup = TestSetup::new();
    let now = chrono::Utc::now().timestamp();
    let expired = sign_token(
        &json!({ "sub": "auth0|alice", "iat": now - 7200, "exp": now - 3600 }),
        Some(TEST_KID),
        backend::jwt::test_keys::TEST_PRIVATE_KEY_PEM,
    );

    let (status, body) = list_with(&setup, Some(&format!("Bearer {expired}"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_token");
}

#[tokio::test]
async fn test_every_todo_route_requires_auth() {
    let setup = TestSetup::new();
    let todo = setup.seed_todo("auth0|alice", "secret").await;
    let item_route = format!("/todos/{}", todo.todo_id);
    let attachment_route = format!("/todos/{}/attachment", todo.todo_id);

    let requests = [
        ("GET", "/todos", None),
        ("POST", "/todos", Some(json!({ "name": "x", "dueDate": "2026-11-01" }))),
        (
            "PATCH",
            item_route.as_str(),
            Some(json!({ "name": "x", "dueDate": "2026-11-01", "done": true })),
        ),
        ("DELETE", item_route.as_str(), None),
        ("POST", attachment_route.as_str(), None),
    ];

    for (method, route, payload) in requests {
        let response = setup
            .send_request(method, route, None, payload)
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {route} should require auth"
        );
    }

    assert_eq!(setup.todo_storage.len().await, 1);
}

#[tokio::test]
async fn test_disabled_auth_trusts_token_as_user_id() {
    let setup = TestSetup::with_environment(Environment::Development { disable_auth: true });
    setup.seed_todo("dev-user", "local").await;

    let (status, body) = list_with(&setup, Some("Bearer dev-user")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["name"], "local");
}

#[tokio::test]
async fn test_disabled_auth_still_requires_bearer_header() {
    let setup = TestSetup::with_environment(Environment::Development { disable_auth: true });

    for auth in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer ")] {
        let (status, body) = list_with(&setup, auth).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "missing_token");
    }
}
