//! Owner-scoped task operations.
//!
//! [`TaskStore`] validates caller input, stamps timestamps and delegates to
//! a [`TaskRepository`]. The owner is always a separate argument supplied by
//! the authorization layer; nothing in the input types can name an owner.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::{
    Clock, NewTask, OwnerId, Priority, Task, TaskChanges, TaskId, TaskPatch,
};
use crate::infrastructure::{RepositoryError, TaskRepository};

// =============================================================================
// Errors
// =============================================================================

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: {}", self.field, self.message)
    }
}

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, Error)]
pub enum TaskStoreError {
    /// Input was rejected. Nothing was written.
    #[error("validation failed: {}", format_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// No task with that ID exists for the caller.
    #[error("task not found")]
    NotFound,

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Storage(#[source] RepositoryError),
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn storage_error(operation: &'static str, owner: &OwnerId, source: RepositoryError) -> TaskStoreError {
    error!(operation, owner_id = %owner, error = %source, "Task storage failure");
    TaskStoreError::Storage(source)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_title(title: &str) -> Result<String, FieldViolation> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(FieldViolation::new("title", "Title must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn validate_priority(priority: &str) -> Result<Priority, FieldViolation> {
    priority
        .parse()
        .map_err(|error: crate::domain::InvalidPriority| {
            FieldViolation::new("priority", error.to_string())
        })
}

/// Validated fields of a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidatedNewTask {
    title: String,
    priority: Option<Priority>,
    description: Option<String>,
    summary: Option<String>,
    category: Option<String>,
    predicted_deadline: Option<String>,
}

fn validate_new_task(fields: NewTask) -> Result<ValidatedNewTask, Vec<FieldViolation>> {
    let title = fields
        .title
        .as_deref()
        .map_or_else(
            || Err(FieldViolation::new("title", "Title is required")),
            validate_title,
        );
    let priority = fields.priority.as_deref().map(validate_priority).transpose();

    match (title, priority) {
        (Ok(title), Ok(priority)) => Ok(ValidatedNewTask {
            title,
            priority,
            description: fields.description,
            summary: fields.summary,
            category: fields.category,
            predicted_deadline: fields.predicted_deadline,
        }),
        (title, priority) => Err(title
            .err()
            .into_iter()
            .chain(priority.err())
            .collect()),
    }
}

fn validate_patch(patch: TaskPatch) -> Result<TaskChanges, Vec<FieldViolation>> {
    let title = patch.title.as_deref().map(validate_title).transpose();
    let priority = patch.priority.as_deref().map(validate_priority).transpose();

    match (title, priority) {
        (Ok(title), Ok(priority)) => Ok(TaskChanges {
            title,
            description: patch.description,
            summary: patch.summary,
            category: patch.category,
            predicted_deadline: patch.predicted_deadline,
            completed: patch.completed,
            priority,
        }),
        (title, priority) => Err(title
            .err()
            .into_iter()
            .chain(priority.err())
            .collect()),
    }
}

fn build_task(
    task_id: TaskId,
    owner: OwnerId,
    validated: ValidatedNewTask,
    clock: &dyn Clock,
) -> Task {
    let base = Task::new(task_id, owner, validated.title, clock.timestamp());
    let base = match validated.description {
        Some(description) => base.with_description(description),
        None => base,
    };
    let base = match validated.summary {
        Some(summary) => base.with_summary(summary),
        None => base,
    };
    let base = match validated.category {
        Some(category) => base.with_category(category),
        None => base,
    };
    let base = match validated.predicted_deadline {
        Some(deadline) => base.with_predicted_deadline(deadline),
        None => base,
    };
    match validated.priority {
        Some(priority) => base.with_priority(priority),
        None => base,
    }
}

// =============================================================================
// Task Store
// =============================================================================

/// Owner-scoped CRUD over a task repository.
#[derive(Clone)]
pub struct TaskStore {
    repository: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
}

impl TaskStore {
    #[must_use]
    pub fn new(repository: Arc<dyn TaskRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Creates a task owned by `owner`.
    ///
    /// # Errors
    ///
    /// `Validation` when the title is missing or blank or the priority is
    /// not allowed; `Storage` when the repository fails.
    pub async fn create(&self, owner: &OwnerId, fields: NewTask) -> Result<Task, TaskStoreError> {
        let validated = validate_new_task(fields).map_err(TaskStoreError::Validation)?;
        let task = build_task(
            TaskId::generate(),
            owner.clone(),
            validated,
            self.clock.as_ref(),
        );

        self.repository
            .insert(&task)
            .await
            .map_err(|source| storage_error("create", owner, source))?;

        info!(owner_id = %owner, task_id = %task.task_id, "Task created");
        Ok(task)
    }

    /// Lists the owner's tasks, newest first. Empty when there are none.
    ///
    /// # Errors
    ///
    /// `Storage` when the repository fails.
    pub async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Task>, TaskStoreError> {
        let tasks = self
            .repository
            .list_by_owner(owner)
            .await
            .map_err(|source| storage_error("list", owner, source))?;
        debug!(owner_id = %owner, count = tasks.len(), "Tasks listed");
        Ok(tasks)
    }

    /// Fetches one of the owner's tasks.
    ///
    /// # Errors
    ///
    /// `NotFound` when the task does not exist or belongs to someone else.
    pub async fn get_by_id_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> Result<Task, TaskStoreError> {
        self.repository
            .find_for_owner(owner, id)
            .await
            .map_err(|source| storage_error("get", owner, source))?
            .ok_or(TaskStoreError::NotFound)
    }

    /// Merges `patch` over one of the owner's tasks.
    ///
    /// The whole patch is validated before anything is read or written.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank title or a disallowed priority, `NotFound`
    /// under the same rule as [`TaskStore::get_by_id_for_owner`].
    pub async fn update_by_id_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Task, TaskStoreError> {
        let changes = validate_patch(patch).map_err(TaskStoreError::Validation)?;
        let existing = self.get_by_id_for_owner(owner, id).await?;
        let updated = existing.apply_changes(changes, self.clock.timestamp());

        match self.repository.replace_for_owner(&updated).await {
            Ok(()) => {
                info!(owner_id = %owner, task_id = %id, "Task updated");
                Ok(updated)
            }
            Err(RepositoryError::NotFound(_)) => Err(TaskStoreError::NotFound),
            Err(source) => Err(storage_error("update", owner, source)),
        }
    }

    /// Deletes one of the owner's tasks and returns its ID.
    ///
    /// # Errors
    ///
    /// `NotFound` under the same rule as [`TaskStore::get_by_id_for_owner`].
    pub async fn delete_by_id_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> Result<TaskId, TaskStoreError> {
        let deleted = self
            .repository
            .delete_for_owner(owner, id)
            .await
            .map_err(|source| storage_error("delete", owner, source))?;

        if deleted {
            info!(owner_id = %owner, task_id = %id, "Task deleted");
            Ok(id.clone())
        } else {
            Err(TaskStoreError::NotFound)
        }
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TaskStore")
            .field("repository", &"Arc<dyn TaskRepository>")
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
