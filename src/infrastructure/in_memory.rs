//! In-memory repository implementation.
//!
//! Backs the default storage mode and the demo client. Thread-safe through
//! `Arc<RwLock<...>>`; clones share the same underlying map.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;

use crate::domain::{OwnerId, Task, TaskId};
use crate::infrastructure::repository::sort_newest_first;
use crate::infrastructure::{RepositoryError, TaskRepository};

// =============================================================================
// In-Memory Task Repository
// =============================================================================

/// In-memory implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let repository = InMemoryTaskRepository::new();
/// let owner = OwnerId::new("u1");
/// let task = Task::new(TaskId::generate(), owner.clone(), "My Task", Timestamp::now());
///
/// repository.insert(&task).await?;
/// let found = repository.find_for_owner(&owner, &task.task_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates a new empty in-memory task repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TaskRepository for InMemoryTaskRepository {
    fn insert(&self, task: &Task) -> BoxFuture<'static, Result<(), RepositoryError>> {
        let tasks = Arc::clone(&self.tasks);
        let task = task.clone();
        Box::pin(async move {
            let mut guard = tasks.write().await;
            if guard.contains_key(&task.task_id) {
                return Err(RepositoryError::DatabaseError(format!(
                    "duplicate task id: {}",
                    task.task_id
                )));
            }
            guard.insert(task.task_id.clone(), task);
            Ok(())
        })
    }

    fn list_by_owner(
        &self,
        owner: &OwnerId,
    ) -> BoxFuture<'static, Result<Vec<Task>, RepositoryError>> {
        let tasks = Arc::clone(&self.tasks);
        let owner = owner.clone();
        Box::pin(async move {
            let guard = tasks.read().await;
            let mut owned: Vec<Task> = guard
                .values()
                .filter(|task| task.is_owned_by(&owner))
                .cloned()
                .collect();
            drop(guard);
            sort_newest_first(&mut owned);
            Ok(owned)
        })
    }

    fn find_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> BoxFuture<'static, Result<Option<Task>, RepositoryError>> {
        let tasks = Arc::clone(&self.tasks);
        let owner = owner.clone();
        let id = id.clone();
        Box::pin(async move {
            let guard = tasks.read().await;
            Ok(guard
                .get(&id)
                .filter(|task| task.is_owned_by(&owner))
                .cloned())
        })
    }

    fn replace_for_owner(&self, task: &Task) -> BoxFuture<'static, Result<(), RepositoryError>> {
        let tasks = Arc::clone(&self.tasks);
        let task = task.clone();
        Box::pin(async move {
            let mut guard = tasks.write().await;
            match guard.get_mut(&task.task_id) {
                Some(existing) if existing.is_owned_by(&task.owner_id) => {
                    *existing = task;
                    Ok(())
                }
                _ => Err(RepositoryError::NotFound(task.task_id.to_string())),
            }
        })
    }

    fn delete_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> BoxFuture<'static, Result<bool, RepositoryError>> {
        let tasks = Arc::clone(&self.tasks);
        let owner = owner.clone();
        let id = id.clone();
        Box::pin(async move {
            let mut guard = tasks.write().await;
            let owned = guard.get(&id).is_some_and(|task| task.is_owned_by(&owner));
            if owned {
                guard.remove(&id);
            }
            Ok(owned)
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    // -------------------------------------------------------------------------
    // Helper functions for tests
    // -------------------------------------------------------------------------

    fn test_task(owner: &str, title: &str) -> Task {
        Task::new(TaskId::generate(), OwnerId::new(owner), title, Timestamp::now())
    }

    fn test_task_at(owner: &str, title: &str, seconds: i64) -> Task {
        let created = Timestamp::from_datetime(Utc.timestamp_opt(seconds, 0).unwrap());
        Task::new(TaskId::generate(), OwnerId::new(owner), title, created)
    }

    // -------------------------------------------------------------------------
    // InMemoryTaskRepository Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    async fn test_find_for_owner_not_found() {
        let repository = InMemoryTaskRepository::new();

        let result = repository
            .find_for_owner(&OwnerId::new("u1"), &TaskId::generate())
            .await;

        assert!(result.unwrap().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_insert_and_find_for_owner() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("u1", "Write report");

        repository.insert(&task).await.unwrap();
        let found = repository
            .find_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap();

        assert_eq!(found, Some(task));
    }

    #[rstest]
    #[tokio::test]
    async fn test_insert_duplicate_id_fails() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("u1", "Once");

        repository.insert(&task).await.unwrap();
        let result = repository.insert(&task).await;

        assert!(matches!(result, Err(RepositoryError::DatabaseError(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_find_for_other_owner_returns_none() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("alice", "Private");
        repository.insert(&task).await.unwrap();

        let found = repository
            .find_for_owner(&OwnerId::new("bob"), &task.task_id)
            .await
            .unwrap();

        assert!(found.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn test_list_by_owner_filters_and_orders_newest_first() {
        let repository = InMemoryTaskRepository::new();
        let first = test_task_at("u1", "t1", 10);
        let second = test_task_at("u1", "t2", 20);
        let third = test_task_at("u1", "t3", 30);
        let foreign = test_task_at("u2", "other", 40);
        for task in [&second, &foreign, &first, &third] {
            repository.insert(task).await.unwrap();
        }

        let listed = repository.list_by_owner(&OwnerId::new("u1")).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|task| task.title.as_str()).collect();

        assert_eq!(titles, vec!["t3", "t2", "t1"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_list_by_owner_empty() {
        let repository = InMemoryTaskRepository::new();
        let listed = repository.list_by_owner(&OwnerId::new("nobody")).await.unwrap();
        assert!(listed.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_replace_for_owner_overwrites() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("u1", "Old");
        repository.insert(&task).await.unwrap();

        let updated = task.clone().with_completed(true);
        repository.replace_for_owner(&updated).await.unwrap();

        let found = repository
            .find_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap()
            .unwrap();
        assert!(found.completed);
    }

    #[rstest]
    #[tokio::test]
    async fn test_replace_for_wrong_owner_is_not_found() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("alice", "Mine");
        repository.insert(&task).await.unwrap();

        let hijacked = Task {
            owner_id: OwnerId::new("mallory"),
            ..task.clone()
        };
        let result = repository.replace_for_owner(&hijacked).await;

        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
        let untouched = repository
            .find_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap();
        assert_eq!(untouched, Some(task));
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_for_owner() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("u1", "Delete me");
        repository.insert(&task).await.unwrap();

        let deleted = repository
            .delete_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap();
        let deleted_again = repository
            .delete_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap();

        assert!(deleted);
        assert!(!deleted_again);
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_for_other_owner_keeps_task() {
        let repository = InMemoryTaskRepository::new();
        let task = test_task("alice", "Keep me");
        repository.insert(&task).await.unwrap();

        let deleted = repository
            .delete_for_owner(&OwnerId::new("bob"), &task.task_id)
            .await
            .unwrap();

        assert!(!deleted);
        assert!(
            repository
                .find_for_owner(&task.owner_id, &task.task_id)
                .await
                .unwrap()
                .is_some()
        );
    }
}
