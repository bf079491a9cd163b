//! Repository traits for task persistence.
//!
//! Every method takes the owner explicitly. There is no way to read or
//! write a task through this trait without naming who owns it, and a task
//! owned by someone else looks exactly like a task that does not exist.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{OwnerId, Task, TaskId};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone)]
pub enum RepositoryError {
    /// Entity was not found.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Database connection error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Task Repository
// =============================================================================

/// Owner-scoped storage primitives for `Task` records.
///
/// All methods return a boxed `'static` future so the trait stays object
/// safe and can be shared as `Arc<dyn TaskRepository>`.
pub trait TaskRepository: Send + Sync {
    /// Stores a new task. Its `task_id` must not already exist.
    fn insert(&self, task: &Task) -> BoxFuture<'static, Result<(), RepositoryError>>;

    /// Lists the owner's tasks, newest `created_at` first.
    ///
    /// Ties are broken by `task_id` descending.
    fn list_by_owner(&self, owner: &OwnerId)
    -> BoxFuture<'static, Result<Vec<Task>, RepositoryError>>;

    /// Finds a task by ID, but only if `owner` owns it.
    fn find_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> BoxFuture<'static, Result<Option<Task>, RepositoryError>>;

    /// Overwrites an existing task owned by `task.owner_id`.
    ///
    /// Fails with `RepositoryError::NotFound` when no such task exists for
    /// that owner, for example because it was deleted concurrently.
    fn replace_for_owner(&self, task: &Task) -> BoxFuture<'static, Result<(), RepositoryError>>;

    /// Deletes a task owned by `owner`.
    ///
    /// Returns `Ok(true)` if the task was deleted, `Ok(false)` if it didn't
    /// exist for that owner.
    fn delete_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> BoxFuture<'static, Result<bool, RepositoryError>>;
}

/// Sorts tasks newest first, breaking ties by ID.
pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        right
            .created_at
            .cmp(&left.created_at)
            .then_with(|| right.task_id.cmp(&left.task_id))
    });
}
