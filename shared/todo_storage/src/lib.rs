//! Todo storage for the todo backend
//!
//! This crate owns the todo table model, the `DynamoDB` client used by the API and
//! the [`TodoRepository`] seam that handlers depend on.

pub mod todo;

pub use todo::{
    TodoAttribute, TodoItem, TodoRepository, TodoStorage, TodoStorageError, TodoStorageResult,
    TodoUpdate,
};

#[cfg(any(test, feature = "test-utils"))]
pub use todo::InMemoryTodoStorage;
