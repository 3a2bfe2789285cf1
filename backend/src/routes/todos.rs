use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use chrono::{DateTime, NaiveDate, SecondsFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use todo_storage::{TodoItem, TodoRepository, TodoUpdate};
use validator::Validate;

use crate::{
    attachment_storage::AttachmentStorage,
    middleware::AuthenticatedUser,
    types::{AppError, ValidatedJson},
};

/// Maximum length of a todo name, after trimming
const MAX_NAME_LEN: usize = 255;

/// Request to create a todo
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    /// Short title of the todo
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    /// Due date
    #[validate(custom(function = "validate_due_date"))]
    #[schemars(description = "`YYYY-MM-DD` date or RFC 3339 timestamp")]
    pub due_date: String,

    /// Free-form description
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Request to update a todo
///
/// Replaces the name, due date and completion state. The description is only
/// changed when provided.
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    /// Short title of the todo
    #[validate(custom(function = "validate_name"))]
    pub name: String,

    /// Due date
    #[validate(custom(function = "validate_due_date"))]
    #[schemars(description = "`YYYY-MM-DD` date or RFC 3339 timestamp")]
    pub due_date: String,

    /// Whether the todo is completed
    pub done: bool,

    /// Free-form description
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Path parameters for routes addressing a single todo
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoPathParams {
    /// Todo ID
    pub todo_id: String,
}

/// The caller's todos
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListTodosResponse {
    /// Todos ordered by creation time, oldest first
    pub items: Vec<TodoItem>,
}

/// The newly created todo
#[derive(Debug, Serialize, JsonSchema)]
pub struct CreateTodoResponse {
    /// Created todo
    pub item: TodoItem,
}

/// Presigned attachment upload
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// Presigned URL to `PUT` the attachment to
    pub upload_url: String,
    /// Public URL the attachment will be served from
    pub attachment_url: String,
    /// RFC 3339 timestamp after which `upload_url` stops working
    pub expires_at: String,
}

fn validate_name(name: &str) -> Result<(), validator::ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        let mut error = validator::ValidationError::new("invalid_name");
        error.message = Some(std::borrow::Cow::Borrowed(
            "Name must be between 1 and 255 characters",
        ));
        return Err(error);
    }

    Ok(())
}

fn validate_due_date(due_date: &str) -> Result<(), validator::ValidationError> {
    let is_date = NaiveDate::parse_from_str(due_date, "%Y-%m-%d").is_ok();
    if is_date || DateTime::parse_from_rfc3339(due_date).is_ok() {
        return Ok(());
    }

    let mut error = validator::ValidationError::new("invalid_due_date");
    error.message = Some(std::borrow::Cow::Borrowed(
        "Due date must be a YYYY-MM-DD date or an RFC 3339 timestamp",
    ));
    Err(error)
}

/// Loads a todo and checks that `user` owns it
async fn owned_todo(
    todo_repository: &dyn TodoRepository,
    todo_id: &str,
    user: &AuthenticatedUser,
) -> Result<TodoItem, AppError> {
    let Some(todo) = todo_repository.get(todo_id).await? else {
        return Err(AppError::todo_not_found());
    };

    if todo.user_id != user.user_id {
        tracing::warn!("User tried to access a todo they do not own");
        return Err(AppError::forbidden());
    }

    Ok(todo)
}

/// List the caller's todos
///
/// # Returns
///
/// Returns `200 OK` with the caller's todos, oldest first
///
/// # Errors
///
/// Returns an error if:
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list_todos(
    user: AuthenticatedUser,
    Extension(todo_repository): Extension<Arc<dyn TodoRepository>>,
) -> Result<Json<ListTodosResponse>, AppError> {
    let items = todo_repository.list_by_user(&user.user_id).await?;
    tracing::info!(count = items.len(), "Listed todos");

    Ok(Json(ListTodosResponse { items }))
}

/// Create a todo
///
/// The todo is owned by the caller, starts as not done and has no attachment.
///
/// # Arguments
///
/// * `user` - The authenticated user creating the todo
/// * `payload` - Name, due date and optional description
///
/// # Returns
///
/// Returns `201 CREATED` with the stored todo
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid request body
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_todo(
    user: AuthenticatedUser,
    Extension(todo_repository): Extension<Arc<dyn TodoRepository>>,
    ValidatedJson(payload): ValidatedJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<CreateTodoResponse>), AppError> {
    let item = TodoItem::new(
        user.user_id,
        payload.name.trim(),
        payload.due_date,
        payload.description,
    );

    todo_repository.put(&item).await?;
    tracing::info!(todo_id = %item.todo_id, "Created todo");

    Ok((StatusCode::CREATED, Json(CreateTodoResponse { item })))
}

/// Update a todo
///
/// # Arguments
///
/// * `user` - The authenticated user, who must own the todo
/// * `todo_id` - Path parameter containing the todo ID
/// * `payload` - New name, due date, completion state and optional description
///
/// # Returns
///
/// Returns `204 NO_CONTENT` on success
///
/// # Errors
///
/// Returns an error if:
/// - `400 BAD_REQUEST` - Invalid request body
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `403 FORBIDDEN` - The todo belongs to another user
/// - `404 NOT_FOUND` - Todo does not exist
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
#[tracing::instrument(skip_all, fields(user_id = %user.user_id, todo_id = %params.todo_id))]
pub async fn update_todo(
    user: AuthenticatedUser,
    Path(params): Path<TodoPathParams>,
    Extension(todo_repository): Extension<Arc<dyn TodoRepository>>,
    ValidatedJson(payload): ValidatedJson<UpdateTodoRequest>,
) -> Result<StatusCode, AppError> {
    owned_todo(todo_repository.as_ref(), &params.todo_id, &user).await?;

    let update = TodoUpdate {
        name: payload.name.trim().to_string(),
        due_date: payload.due_date,
        done: payload.done,
        description: payload.description,
    };
    todo_repository.update(&params.todo_id, &update).await?;
    tracing::info!("Updated todo");

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a todo
///
/// An uploaded attachment object is left in the bucket.
///
/// # Returns
///
/// Returns `204 NO_CONTENT` on success
///
/// # Errors
///
/// Returns an error if:
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `403 FORBIDDEN` - The todo belongs to another user
/// - `404 NOT_FOUND` - Todo does not exist
/// - `500 INTERNAL_SERVER_ERROR` - Storage operation fails
#[tracing::instrument(skip_all, fields(user_id = %user.user_id, todo_id = %params.todo_id))]
pub async fn delete_todo(
    user: AuthenticatedUser,
    Path(params): Path<TodoPathParams>,
    Extension(todo_repository): Extension<Arc<dyn TodoRepository>>,
) -> Result<StatusCode, AppError> {
    owned_todo(todo_repository.as_ref(), &params.todo_id, &user).await?;

    todo_repository.delete(&params.todo_id).await?;
    tracing::info!("Deleted todo");

    Ok(StatusCode::NO_CONTENT)
}

/// Generate an attachment upload URL
///
/// Presigns an S3 upload under a fresh attachment ID and records the
/// attachment's public URL on the todo. The client then uploads the file
/// directly to S3 with `PUT`.
///
/// # Returns
///
/// Returns `200 OK` with the upload URL, the public attachment URL and the
/// upload URL's expiry
///
/// # Errors
///
/// Returns an error if:
/// - `401 UNAUTHORIZED` - Invalid or missing authentication
/// - `403 FORBIDDEN` - The todo belongs to another user
/// - `404 NOT_FOUND` - Todo does not exist
/// - `500 INTERNAL_SERVER_ERROR` - Presigning or storage operation fails
#[tracing::instrument(skip_all, fields(user_id = %user.user_id, todo_id = %params.todo_id))]
pub async fn generate_upload_url(
    user: AuthenticatedUser,
    Path(params): Path<TodoPathParams>,
    Extension(todo_repository): Extension<Arc<dyn TodoRepository>>,
    Extension(attachment_storage): Extension<Arc<AttachmentStorage>>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    owned_todo(todo_repository.as_ref(), &params.todo_id, &user).await?;

    let attachment_id = uuid::Uuid::new_v4().to_string();
    let presigned = attachment_storage
        .generate_presigned_put_url(&attachment_id)
        .await?;
    let attachment_url = attachment_storage.attachment_url(&attachment_id);

    todo_repository
        .set_attachment_url(&params.todo_id, &attachment_url)
        .await?;
    tracing::info!(%attachment_id, "Generated attachment upload URL");

    Ok(Json(UploadUrlResponse {
        upload_url: presigned.url,
        attachment_url,
        expires_at: presigned
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
