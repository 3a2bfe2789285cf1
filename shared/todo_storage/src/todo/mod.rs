//! Todo storage module for `DynamoDB` operations

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::SdkError, types::AttributeValue, Client as DynamoDbClient};
use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_dynamo::{from_items, to_item};
use strum::Display;

pub use error::{TodoStorageError, TodoStorageResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryTodoStorage;

/// `DynamoDB` table item for a todo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    /// Owner of the todo (subject of the bearer token)
    pub user_id: String,
    /// Primary key - unique todo ID (UUID v4)
    pub todo_id: String,
    /// ISO-8601 UTC creation timestamp
    pub created_at: String,
    /// Name of the todo
    pub name: String,
    /// Due date as sent by the client
    pub due_date: String,
    /// Whether the todo is completed
    pub done: bool,
    /// Public URL of the uploaded attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TodoItem {
    /// Builds a fresh, not yet completed todo owned by `user_id`
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        due_date: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            todo_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            name: name.into(),
            due_date: due_date.into(),
            done: false,
            attachment_url: None,
            description,
        }
    }
}

/// Mutable fields of a todo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoUpdate {
    /// New name
    pub name: String,
    /// New due date
    pub due_date: String,
    /// New completion flag
    pub done: bool,
    /// New description, left untouched when `None`
    pub description: Option<String>,
}

/// `DynamoDB` attribute names for the todo table
#[derive(Debug, Display)]
#[strum(serialize_all = "camelCase")]
pub enum TodoAttribute {
    /// Owner ID (hash key of the by-user GSI)
    UserId,
    /// Primary key - unique todo ID
    TodoId,
    /// Creation timestamp
    CreatedAt,
    /// Todo name
    Name,
    /// Due date
    DueDate,
    /// Completion flag
    Done,
    /// Attachment URL
    AttachmentUrl,
    /// Description
    Description,
}

/// Data access for todo items
///
/// Handlers depend on this trait so the HTTP layer can be exercised without `DynamoDB`.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Lists every todo owned by `user_id`, oldest first
    async fn list_by_user(&self, user_id: &str) -> TodoStorageResult<Vec<TodoItem>>;

    /// Gets a single todo by ID
    async fn get(&self, todo_id: &str) -> TodoStorageResult<Option<TodoItem>>;

    /// Stores a new todo, failing with [`TodoStorageError::TodoExists`] on ID collision
    async fn put(&self, item: &TodoItem) -> TodoStorageResult<()>;

    /// Applies `update` to an existing todo
    async fn update(&self, todo_id: &str, update: &TodoUpdate) -> TodoStorageResult<()>;

    /// Deletes an existing todo
    async fn delete(&self, todo_id: &str) -> TodoStorageResult<()>;

    /// Records the attachment URL of an existing todo
    async fn set_attachment_url(&self, todo_id: &str, attachment_url: &str)
        -> TodoStorageResult<()>;
}

/// Storage client for todo operations
pub struct TodoStorage {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
    user_index_name: String,
}

impl TodoStorage {
    /// Creates a new storage instance
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured `DynamoDB` client
    /// * `table_name` - `DynamoDB` table name for todos
    /// * `user_index_name` - Name of the GSI keyed by `userId`
    #[must_use]
    pub const fn new(
        dynamodb_client: Arc<DynamoDbClient>,
        table_name: String,
        user_index_name: String,
    ) -> Self {
        Self {
            dynamodb_client,
            table_name,
            user_index_name,
        }
    }

    fn todo_key(todo_id: &str) -> (String, AttributeValue) {
        (
            TodoAttribute::TodoId.to_string(),
            AttributeValue::S(todo_id.to_string()),
        )
    }
}

/// Maps a failed `attribute_exists` condition to [`TodoStorageError::TodoNotFound`]
fn map_missing<E>(todo_id: &str, err: SdkError<E>) -> TodoStorageError
where
    E: ConditionalCheck,
    TodoStorageError: From<SdkError<E>>,
{
    if matches!(
        err,
        SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed()
    ) {
        TodoStorageError::TodoNotFound(todo_id.to_string())
    } else {
        err.into()
    }
}

/// Operation errors that can report a failed condition expression
trait ConditionalCheck {
    fn is_conditional_check_failed(&self) -> bool;
}

impl ConditionalCheck for aws_sdk_dynamodb::operation::update_item::UpdateItemError {
    fn is_conditional_check_failed(&self) -> bool {
        self.is_conditional_check_failed_exception()
    }
}

impl ConditionalCheck for aws_sdk_dynamodb::operation::delete_item::DeleteItemError {
    fn is_conditional_check_failed(&self) -> bool {
        self.is_conditional_check_failed_exception()
    }
}

#[async_trait]
impl TodoRepository for TodoStorage {
    async fn list_by_user(&self, user_id: &str) -> TodoStorageResult<Vec<TodoItem>> {
        let mut todos = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let response = self
                .dynamodb_client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.user_index_name)
                .key_condition_expression("#user_id = :user_id")
                .expression_attribute_names("#user_id", TodoAttribute::UserId.to_string())
                .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
                .set_exclusive_start_key(exclusive_start_key)
                .send()
                .await?;

            let items = response.items.unwrap_or_default();
            todos.extend(from_items::<_, TodoItem>(items)?);

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        todos.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        tracing::debug!("Fetched {} todos for user {user_id}", todos.len());

        Ok(todos)
    }

    async fn get(&self, todo_id: &str) -> TodoStorageResult<Option<TodoItem>> {
        let (key, value) = Self::todo_key(todo_id);
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(key, value)
            .send()
            .await?;

        response
            .item()
            .map(|item| {
                serde_dynamo::from_item(item.clone())
                    .map_err(|e| TodoStorageError::SerializationError(e.to_string()))
            })
            .transpose()
    }

    async fn put(&self, item: &TodoItem) -> TodoStorageResult<()> {
        let dynamo_item = to_item(item)?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(dynamo_item))
            .condition_expression("attribute_not_exists(#todo_id)")
            .expression_attribute_names("#todo_id", TodoAttribute::TodoId.to_string())
            .send()
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SdkError::ServiceError(ref svc) if svc.err().is_conditional_check_failed_exception()
                ) {
                    TodoStorageError::TodoExists(item.todo_id.clone())
                } else {
                    err.into()
                }
            })?;

        tracing::debug!("Todo item {} was created", item.todo_id);

        Ok(())
    }

    async fn update(&self, todo_id: &str, update: &TodoUpdate) -> TodoStorageResult<()> {
        let (key, value) = Self::todo_key(todo_id);
        let mut update_expression =
            String::from("SET #name = :name, #due_date = :due_date, #done = :done");

        let mut request = self
            .dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(key, value)
            .condition_expression("attribute_exists(#todo_id)")
            .expression_attribute_names("#todo_id", TodoAttribute::TodoId.to_string())
            .expression_attribute_names("#name", TodoAttribute::Name.to_string())
            .expression_attribute_values(":name", AttributeValue::S(update.name.clone()))
            .expression_attribute_names("#due_date", TodoAttribute::DueDate.to_string())
            .expression_attribute_values(":due_date", AttributeValue::S(update.due_date.clone()))
            .expression_attribute_names("#done", TodoAttribute::Done.to_string())
            .expression_attribute_values(":done", AttributeValue::Bool(update.done));

        if let Some(description) = &update.description {
            update_expression.push_str(", #description = :description");
            request = request
                .expression_attribute_names("#description", TodoAttribute::Description.to_string())
                .expression_attribute_values(
                    ":description",
                    AttributeValue::S(description.clone()),
                );
        }

        request
            .update_expression(update_expression)
            .send()
            .await
            .map_err(|err| map_missing(todo_id, err))?;

        tracing::debug!("Todo item {todo_id} was updated");

        Ok(())
    }

    async fn delete(&self, todo_id: &str) -> TodoStorageResult<()> {
        let (key, value) = Self::todo_key(todo_id);
        self.dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .key(key, value)
            .condition_expression("attribute_exists(#todo_id)")
            .expression_attribute_names("#todo_id", TodoAttribute::TodoId.to_string())
            .send()
            .await
            .map_err(|err| map_missing(todo_id, err))?;

        tracing::debug!("Todo item {todo_id} was deleted");

        Ok(())
    }

    async fn set_attachment_url(
        &self,
        todo_id: &str,
        attachment_url: &str,
    ) -> TodoStorageResult<()> {
        let (key, value) = Self::todo_key(todo_id);
        self.dynamodb_client
            .update_item()
            .table_name(&self.table_name)
            .key(key, value)
            .update_expression("SET #attachment_url = :attachment_url")
            .condition_expression("attribute_exists(#todo_id)")
            .expression_attribute_names("#todo_id", TodoAttribute::TodoId.to_string())
            .expression_attribute_names(
                "#attachment_url",
                TodoAttribute::AttachmentUrl.to_string(),
            )
            .expression_attribute_values(
                ":attachment_url",
                AttributeValue::S(attachment_url.to_string()),
            )
            .send()
            .await
            .map_err(|err| map_missing(todo_id, err))?;

        tracing::debug!("Attachment URL for todo {todo_id} was updated");

        Ok(())
    }
}
