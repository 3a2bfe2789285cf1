use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{TodoItem, TodoRepository, TodoStorageError, TodoStorageResult, TodoUpdate};

/// In-memory [`TodoRepository`] with the same conditional semantics as [`super::TodoStorage`]
#[derive(Debug, Default)]
pub struct InMemoryTodoStorage {
    items: RwLock<HashMap<String, TodoItem>>,
}

impl InMemoryTodoStorage {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored todos across all users
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Whether the store holds no todos
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoStorage {
    async fn list_by_user(&self, user_id: &str) -> TodoStorageResult<Vec<TodoItem>> {
        let mut todos: Vec<TodoItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        todos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(todos)
    }

    async fn get(&self, todo_id: &str) -> TodoStorageResult<Option<TodoItem>> {
        Ok(self.items.read().await.get(todo_id).cloned())
    }

    async fn put(&self, item: &TodoItem) -> TodoStorageResult<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.todo_id) {
            return Err(TodoStorageError::TodoExists(item.todo_id.clone()));
        }
        items.insert(item.todo_id.clone(), item.clone());
        Ok(())
    }

    async fn update(&self, todo_id: &str, update: &TodoUpdate) -> TodoStorageResult<()> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(todo_id)
            .ok_or_else(|| TodoStorageError::TodoNotFound(todo_id.to_string()))?;

        item.name.clone_from(&update.name);
        item.due_date.clone_from(&update.due_date);
        item.done = update.done;
        if let Some(description) = &update.description {
            item.description = Some(description.clone());
        }
        Ok(())
    }

    async fn delete(&self, todo_id: &str) -> TodoStorageResult<()> {
        self.items
            .write()
            .await
            .remove(todo_id)
            .map(|_| ())
            .ok_or_else(|| TodoStorageError::TodoNotFound(todo_id.to_string()))
    }

    async fn set_attachment_url(
        &self,
        todo_id: &str,
        attachment_url: &str,
    ) -> TodoStorageResult<()> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(todo_id)
            .ok_or_else(|| TodoStorageError::TodoNotFound(todo_id.to_string()))?;
        item.attachment_url = Some(attachment_url.to_string());
        Ok(())
    }
}
