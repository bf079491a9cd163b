//! `PostgreSQL` repository implementation.
//!
//! Each task is stored as a JSONB document next to the columns needed for
//! scoping and ordering. Every statement filters on `owner_id`.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS tasks (
//!     id UUID PRIMARY KEY,
//!     owner_id TEXT NOT NULL,
//!     data JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX IF NOT EXISTS idx_tasks_owner_created
//!     ON tasks (owner_id, created_at DESC);
//! ```

use futures::future::BoxFuture;
use sqlx::PgPool;

use crate::domain::{OwnerId, Task, TaskId};
use crate::infrastructure::{RepositoryError, TaskRepository};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id UUID PRIMARY KEY,
    owner_id TEXT NOT NULL,
    data JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_owner_created ON tasks (owner_id, created_at DESC)";

// =============================================================================
// PostgreSQL Task Repository
// =============================================================================

/// `PostgreSQL` implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/tasks").await?;
/// let repository = PostgresTaskRepository::new(pool);
/// repository.ensure_schema().await?;
///
/// repository.insert(&task).await?;
/// let found = repository.find_for_owner(&task.owner_id, &task.task_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    /// Connection pool for `PostgreSQL`.
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new `PostgreSQL` task repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `tasks` table and its index if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if either statement fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        for statement in [CREATE_TABLE_SQL, CREATE_INDEX_SQL] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|error| RepositoryError::DatabaseError(error.to_string()))?;
        }
        Ok(())
    }
}

fn serialize_task(task: &Task) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(task).map_err(|error| RepositoryError::SerializationError(error.to_string()))
}

fn deserialize_task(data: serde_json::Value) -> Result<Task, RepositoryError> {
    serde_json::from_value(data)
        .map_err(|error| RepositoryError::SerializationError(error.to_string()))
}

impl TaskRepository for PostgresTaskRepository {
    fn insert(&self, task: &Task) -> BoxFuture<'static, Result<(), RepositoryError>> {
        let pool = self.pool.clone();
        let task = task.clone();

        Box::pin(async move {
            let task_data = serialize_task(&task)?;

            sqlx::query(
                "INSERT INTO tasks (id, owner_id, data, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(task.task_id.as_uuid())
            .bind(task.owner_id.as_str())
            .bind(&task_data)
            .bind(task.created_at.as_datetime())
            .bind(task.updated_at.as_datetime())
            .execute(&pool)
            .await
            .map_err(|error| RepositoryError::DatabaseError(error.to_string()))?;

            Ok(())
        })
    }

    fn list_by_owner(
        &self,
        owner: &OwnerId,
    ) -> BoxFuture<'static, Result<Vec<Task>, RepositoryError>> {
        let pool = self.pool.clone();
        let owner = owner.clone();

        Box::pin(async move {
            let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
                "SELECT data FROM tasks WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
            )
            .bind(owner.as_str())
            .fetch_all(&pool)
            .await
            .map_err(|error| RepositoryError::DatabaseError(error.to_string()))?;

            rows.into_iter()
                .map(|(data,)| deserialize_task(data))
                .collect()
        })
    }

    fn find_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> BoxFuture<'static, Result<Option<Task>, RepositoryError>> {
        let pool = self.pool.clone();
        let owner = owner.clone();
        let task_id = id.clone();

        Box::pin(async move {
            let row: Option<(serde_json::Value,)> =
                sqlx::query_as("SELECT data FROM tasks WHERE id = $1 AND owner_id = $2")
                    .bind(task_id.as_uuid())
                    .bind(owner.as_str())
                    .fetch_optional(&pool)
                    .await
                    .map_err(|error| RepositoryError::DatabaseError(error.to_string()))?;

            row.map(|(data,)| deserialize_task(data)).transpose()
        })
    }

    fn replace_for_owner(&self, task: &Task) -> BoxFuture<'static, Result<(), RepositoryError>> {
        let pool = self.pool.clone();
        let task = task.clone();

        Box::pin(async move {
            let task_data = serialize_task(&task)?;

            let result = sqlx::query(
                "UPDATE tasks SET data = $1, updated_at = $2 WHERE id = $3 AND owner_id = $4",
            )
            .bind(&task_data)
            .bind(task.updated_at.as_datetime())
            .bind(task.task_id.as_uuid())
            .bind(task.owner_id.as_str())
            .execute(&pool)
            .await
            .map_err(|error| RepositoryError::DatabaseError(error.to_string()))?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound(task.task_id.to_string()));
            }
            Ok(())
        })
    }

    fn delete_for_owner(
        &self,
        owner: &OwnerId,
        id: &TaskId,
    ) -> BoxFuture<'static, Result<bool, RepositoryError>> {
        let pool = self.pool.clone();
        let owner = owner.clone();
        let task_id = id.clone();

        Box::pin(async move {
            let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
                .bind(task_id.as_uuid())
                .bind(owner.as_str())
                .execute(&pool)
                .await
                .map_err(|error| RepositoryError::DatabaseError(error.to_string()))?;

            Ok(result.rows_affected() > 0)
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, Timestamp};
    use rstest::rstest;

    fn test_task(owner: &str, title: &str) -> Task {
        Task::new(TaskId::generate(), OwnerId::new(owner), title, Timestamp::now())
    }

    async fn connect() -> PostgresTaskRepository {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());
        let pool = PgPool::connect(&database_url).await.unwrap();
        let repository = PostgresTaskRepository::new(pool);
        repository.ensure_schema().await.unwrap();
        repository
    }

    // -------------------------------------------------------------------------
    // Structure Tests (no DB connection required)
    // -------------------------------------------------------------------------

    #[rstest]
    fn test_task_document_round_trip() {
        let task = test_task("u1", "Document").with_priority(Priority::High);
        let data = serialize_task(&task).unwrap();
        assert_eq!(data["priority"], "high");
        assert_eq!(deserialize_task(data).unwrap(), task);
    }

    #[rstest]
    fn test_deserialize_invalid_document_is_serialization_error() {
        let result = deserialize_task(serde_json::json!({"title": 42}));
        assert!(matches!(result, Err(RepositoryError::SerializationError(_))));
    }

    // -------------------------------------------------------------------------
    // Database Tests
    // -------------------------------------------------------------------------

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_postgres_insert_find_and_delete() {
        let repository = connect().await;
        let task = test_task("pg-owner", "Test Task");

        repository.insert(&task).await.unwrap();
        let found = repository
            .find_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap();
        assert_eq!(found.map(|found| found.title), Some("Test Task".to_string()));

        let deleted = repository
            .delete_for_owner(&task.owner_id, &task.task_id)
            .await
            .unwrap();
        assert!(deleted);
    }

    #[rstest]
    #[tokio::test]
    #[ignore = "Requires PostgreSQL instance"]
    async fn test_postgres_other_owner_cannot_see_or_modify() {
        let repository = connect().await;
        let task = test_task("pg-alice", "Private");
        let intruder = OwnerId::new("pg-bob");
        repository.insert(&task).await.unwrap();

        let found = repository
            .find_for_owner(&intruder, &task.task_id)
            .await
            .unwrap();
        let replaced = repository
            .replace_for_owner(&Task {
                owner_id: intruder.clone(),
                ..task.clone()
            })
            .await;
        let deleted = repository
            .delete_for_owner(&intruder, &task.task_id)
            .await
            .unwrap();

        assert!(found.is_none());
        assert!(matches!(replaced, Err(RepositoryError::NotFound(_))));
        assert!(!deleted);

        let _ = repository
            .delete_for_owner(&task.owner_id, &task.task_id)
            .await;
    }
}
