use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;
use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    attachment_storage::AttachmentStorage,
    jwt::{test_keys, JwtVerifier},
    server::build_router,
    types::Environment,
};
use todo_storage::{
    InMemoryTodoStorage, TodoItem, TodoRepository, TodoStorageError, TodoStorageResult, TodoUpdate,
};
use tower::ServiceExt;

pub const ATTACHMENTS_BUCKET: &str = "todo-attachments";

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Bearer header for a token issued to `user_id` by the test key set
pub fn bearer_for(user_id: &str) -> String {
    format!("Bearer {}", test_keys::valid_token(user_id))
}

/// Repository whose every call fails as if `DynamoDB` timed out
pub struct UnavailableTodoStorage;

fn unavailable<E>() -> SdkError<E> {
    SdkError::timeout_error("DynamoDB request timed out")
}

#[async_trait]
impl TodoRepository for UnavailableTodoStorage {
    async fn list_by_user(&self, _user_id: &str) -> TodoStorageResult<Vec<TodoItem>> {
        Err(TodoStorageError::DynamoDbQueryError(unavailable()))
    }

    async fn get(&self, _todo_id: &str) -> TodoStorageResult<Option<TodoItem>> {
        Err(TodoStorageError::DynamoDbGetError(unavailable()))
    }

    async fn put(&self, _item: &TodoItem) -> TodoStorageResult<()> {
        Err(TodoStorageError::DynamoDbPutError(unavailable()))
    }

    async fn update(&self, _todo_id: &str, _update: &TodoUpdate) -> TodoStorageResult<()> {
        Err(TodoStorageError::DynamoDbUpdateError(unavailable()))
    }

    async fn delete(&self, _todo_id: &str) -> TodoStorageResult<()> {
        Err(TodoStorageError::DynamoDbDeleteError(unavailable()))
    }

    async fn set_attachment_url(
        &self,
        _todo_id: &str,
        _attachment_url: &str,
    ) -> TodoStorageResult<()> {
        Err(TodoStorageError::DynamoDbUpdateError(unavailable()))
    }
}

/// Router wired to in-memory todo storage, offline S3 presigning and a
/// fixed JWKS
pub struct TestSetup {
    pub router: Router,
    pub todo_storage: Arc<InMemoryTodoStorage>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_environment(Environment::Development {
            disable_auth: false,
        })
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self::build(environment, None)
    }

    /// Router whose todo repository always fails
    pub fn with_unavailable_storage() -> Self {
        Self::build(
            Environment::Development {
                disable_auth: false,
            },
            Some(Arc::new(UnavailableTodoStorage)),
        )
    }

    fn build(environment: Environment, repository: Option<Arc<dyn TodoRepository>>) -> Self {
        setup_test_env();

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "static"))
            .build();
        let attachment_storage = Arc::new(AttachmentStorage::new(
            Arc::new(S3Client::from_conf(s3_config)),
            ATTACHMENTS_BUCKET.to_string(),
            300,
        ));

        let todo_storage = Arc::new(InMemoryTodoStorage::new());
        let jwt_verifier = Arc::new(JwtVerifier::with_key_set(
            test_keys::test_jwk_set(),
            None,
            None,
        ));

        let router = build_router(
            environment,
            repository.unwrap_or_else(|| todo_storage.clone() as Arc<dyn TodoRepository>),
            attachment_storage,
            jwt_verifier,
        );

        Self {
            router,
            todo_storage,
        }
    }

    /// Stores a todo for `user_id` directly, bypassing the API
    pub async fn seed_todo(&self, user_id: &str, name: &str) -> TodoItem {
        let item = TodoItem::new(user_id, name, "2026-12-24", None);
        self.todo_storage.put(&item).await.unwrap();
        item
    }

    pub async fn send_request(
        &self,
        method: &str,
        route: &str,
        auth: Option<&str>,
        payload: Option<serde_json::Value>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder().uri(route).method(method);

        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }

        let body = match payload {
            Some(payload) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(payload.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
        auth: Option<&str>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        self.send_request("GET", route, auth, None).await
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        auth: Option<&str>,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        self.send_request("POST", route, auth, Some(payload)).await
    }

    pub async fn parse_response_body(
        &self,
        response: Response,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        use http_body_util::BodyExt;

        let body = response.into_body().collect().await?.to_bytes();
        let json = serde_json::from_slice(&body)?;
        Ok(json)
    }
}
