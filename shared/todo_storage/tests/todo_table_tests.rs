//! `DynamoDB` todo table tests
//!
//! These run against `LocalStack` on `localhost:4566`:
//! `cargo test -p todo_storage -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use pretty_assertions::assert_eq;
use todo_storage::{
    TodoAttribute, TodoItem, TodoRepository, TodoStorage, TodoStorageError, TodoUpdate,
};
use tokio::time::sleep;
use uuid::Uuid;

/// Test configuration for LocalStack
const LOCALSTACK_ENDPOINT: &str = "http://localhost:4566";
const TEST_REGION: &str = "us-east-1";
const TEST_USER_INDEX_NAME: &str = "user-id-index";

/// Test context that automatically cleans up the table on drop
struct TestContext {
    storage: TodoStorage,
    table_name: String,
    dynamodb_client: Arc<DynamoDbClient>,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let client = self.dynamodb_client.clone();
        let table = self.table_name.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = client.delete_table().table_name(&table).send().await;
            });
        }
    }
}

fn key_schema(attribute: TodoAttribute, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(attribute.to_string())
        .key_type(key_type)
        .build()
        .expect("Failed to build key schema")
}

fn string_attribute(attribute: TodoAttribute) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(attribute.to_string())
        .attribute_type(ScalarAttributeType::S)
        .build()
        .expect("Failed to build attribute definition")
}

/// Creates a todo table with the by-user GSI under a unique name
async fn setup_test() -> TestContext {
    let table_name = format!("test-todos-{}", Uuid::new_v4());

    let credentials = Credentials::from_keys("test", "test", None);
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(LOCALSTACK_ENDPOINT)
        .region(Region::new(TEST_REGION))
        .credentials_provider(credentials)
        .load()
        .await;

    let dynamodb_client = Arc::new(DynamoDbClient::new(&config));

    dynamodb_client
        .create_table()
        .table_name(&table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .key_schema(key_schema(TodoAttribute::TodoId, KeyType::Hash))
        .attribute_definitions(string_attribute(TodoAttribute::TodoId))
        .attribute_definitions(string_attribute(TodoAttribute::UserId))
        .attribute_definitions(string_attribute(TodoAttribute::CreatedAt))
        .global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(TEST_USER_INDEX_NAME)
                .key_schema(key_schema(TodoAttribute::UserId, KeyType::Hash))
                .key_schema(key_schema(TodoAttribute::CreatedAt, KeyType::Range))
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()
                .expect("Failed to build GSI"),
        )
        .send()
        .await
        .expect("Failed to create test table");

    sleep(Duration::from_millis(100)).await;

    let storage = TodoStorage::new(
        dynamodb_client.clone(),
        table_name.clone(),
        TEST_USER_INDEX_NAME.to_string(),
    );

    TestContext {
        storage,
        table_name,
        dynamodb_client,
    }
}

fn test_user() -> String {
    format!("auth0|{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_put_and_get_todo() {
    let ctx = setup_test().await;
    let item = TodoItem::new(test_user(), "Buy milk", "2024-05-02", None);

    ctx.storage.put(&item).await.expect("Failed to put todo");

    let stored = ctx
        .storage
        .get(&item.todo_id)
        .await
        .expect("Failed to get todo");
    assert_eq!(stored, Some(item));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_put_rejects_existing_todo_id() {
    let ctx = setup_test().await;
    let item = TodoItem::new(test_user(), "Once", "2024-05-02", None);

    ctx.storage.put(&item).await.expect("Failed to put todo");
    let result = ctx.storage.put(&item).await;

    assert!(matches!(result, Err(TodoStorageError::TodoExists(_))));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_get_missing_todo_returns_none() {
    let ctx = setup_test().await;

    let result = ctx
        .storage
        .get(&Uuid::new_v4().to_string())
        .await
        .expect("Failed to query missing todo");

    assert!(result.is_none());
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_list_by_user_only_returns_owned_todos() {
    let ctx = setup_test().await;
    let user = test_user();

    let first = TodoItem::new(user.clone(), "first", "2024-05-01", None);
    sleep(Duration::from_millis(5)).await;
    let second = TodoItem::new(user.clone(), "second", "2024-05-02", None);
    let foreign = TodoItem::new(test_user(), "foreign", "2024-05-03", None);

    for item in [&second, &foreign, &first] {
        ctx.storage.put(item).await.expect("Failed to put todo");
    }

    // Wait a bit for GSI to be updated
    sleep(Duration::from_millis(100)).await;

    let todos = ctx
        .storage
        .list_by_user(&user)
        .await
        .expect("Failed to list todos");

    let ids: Vec<_> = todos.iter().map(|t| t.todo_id.clone()).collect();
    assert_eq!(ids, vec![first.todo_id, second.todo_id]);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_update_todo() {
    let ctx = setup_test().await;
    let item = TodoItem::new(test_user(), "Draft", "2024-05-02", None);
    ctx.storage.put(&item).await.expect("Failed to put todo");

    let update = TodoUpdate {
        name: "Final".to_string(),
        due_date: "2024-06-01".to_string(),
        done: true,
        description: Some("with notes".to_string()),
    };
    ctx.storage
        .update(&item.todo_id, &update)
        .await
        .expect("Failed to update todo");

    let stored = ctx.storage.get(&item.todo_id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Final");
    assert_eq!(stored.due_date, "2024-06-01");
    assert!(stored.done);
    assert_eq!(stored.description.as_deref(), Some("with notes"));
    assert_eq!(stored.created_at, item.created_at);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_update_missing_todo_fails() {
    let ctx = setup_test().await;
    let update = TodoUpdate {
        name: "Ghost".to_string(),
        due_date: "2024-06-01".to_string(),
        done: false,
        description: None,
    };

    let result = ctx.storage.update("missing", &update).await;

    assert!(matches!(result, Err(TodoStorageError::TodoNotFound(_))));
    // The conditional write must not create an item
    assert!(ctx.storage.get("missing").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_delete_todo() {
    let ctx = setup_test().await;
    let item = TodoItem::new(test_user(), "Short lived", "2024-05-02", None);
    ctx.storage.put(&item).await.expect("Failed to put todo");

    ctx.storage
        .delete(&item.todo_id)
        .await
        .expect("Failed to delete todo");

    assert!(ctx.storage.get(&item.todo_id).await.unwrap().is_none());
    assert!(matches!(
        ctx.storage.delete(&item.todo_id).await,
        Err(TodoStorageError::TodoNotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_set_attachment_url() {
    let ctx = setup_test().await;
    let item = TodoItem::new(test_user(), "With file", "2024-05-02", None);
    ctx.storage.put(&item).await.expect("Failed to put todo");

    let url = "https://todo-attachments.s3.amazonaws.com/abc";
    ctx.storage
        .set_attachment_url(&item.todo_id, url)
        .await
        .expect("Failed to set attachment url");

    let stored = ctx.storage.get(&item.todo_id).await.unwrap().unwrap();
    assert_eq!(stored.attachment_url.as_deref(), Some(url));
}
