//! HTTP handlers for the task endpoints.
//!
//! Every task handler takes an [`AuthenticatedOwner`] and passes its owner
//! to the [`TaskStore`]; request bodies never influence ownership.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Serialize;

use super::auth::AuthenticatedOwner;
use super::dto::{CreateTaskRequest, DeleteTaskResponse, TaskResponse, UpdateTaskRequest};
use super::error::{ApiErrorResponse, TASK_NOT_FOUND_MESSAGE};
use crate::application::TaskStore;
use crate::domain::{Clock, TaskId};
use crate::infrastructure::{
    AiAssistant, AppConfig, CredentialVerifier, Repositories, generator_from_config,
};

/// Body of `GET /`.
pub const ROOT_BANNER: &str = "AI Task Assistant Backend Running";

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
#[derive(Clone)]
pub struct AppState {
    /// Owner-scoped task operations.
    pub task_store: TaskStore,
    /// Task suggestions and chat.
    pub assistant: AiAssistant,
    /// Bearer credential lookup.
    pub credentials: Arc<dyn CredentialVerifier>,
}

impl AppState {
    #[must_use]
    pub fn new(
        task_store: TaskStore,
        assistant: AiAssistant,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            task_store,
            assistant,
            credentials,
        }
    }

    /// Wires the state from initialized repositories and loaded
    /// configuration.
    #[must_use]
    pub fn from_config(
        repositories: Repositories,
        config: &AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let task_store = TaskStore::new(repositories.task_repository, Arc::clone(&clock));
        let assistant = AiAssistant::new(generator_from_config(&config.ai), clock);
        Self::new(task_store, assistant, Arc::new(config.credentials.clone()))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("task_store", &self.task_store)
            .field("assistant", &self.assistant)
            .field("credentials", &"Arc<dyn CredentialVerifier>")
            .finish()
    }
}

/// Parses a path ID. Anything that is not a task ID cannot name an
/// existing task, so it is reported exactly like an unknown one.
fn parse_task_id(raw: &str) -> Result<TaskId, ApiErrorResponse> {
    raw.parse()
        .map_err(|_| ApiErrorResponse::not_found(TASK_NOT_FOUND_MESSAGE))
}

// =============================================================================
// Task Handlers
// =============================================================================

/// `POST /api/tasks`
///
/// # Errors
///
/// 400 for a missing or blank title, a disallowed priority or a malformed
/// body; 500 when storage fails.
pub async fn create_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    request: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiErrorResponse> {
    let Json(request) = request?;
    let task = state.task_store.create(&owner, request.into()).await?;
    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// `GET /api/tasks`: the caller's tasks, newest first.
///
/// # Errors
///
/// 500 when storage fails.
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> Result<Json<Vec<TaskResponse>>, ApiErrorResponse> {
    let tasks = state.task_store.list_by_owner(&owner).await?;
    Ok(Json(tasks.iter().map(TaskResponse::from).collect()))
}

/// `GET /api/tasks/{id}`
///
/// # Errors
///
/// 404 when the task is absent or owned by someone else.
pub async fn get_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiErrorResponse> {
    let task_id = parse_task_id(&id)?;
    let task = state.task_store.get_by_id_for_owner(&owner, &task_id).await?;
    Ok(Json(TaskResponse::from(task)))
}

/// `PUT /api/tasks/{id}` and `PATCH /api/tasks/{id}`: partial merge.
///
/// # Errors
///
/// 404 under the same rule as [`get_task`]; 400 for invalid fields, in
/// which case nothing is changed.
pub async fn update_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
    request: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, ApiErrorResponse> {
    let task_id = parse_task_id(&id)?;
    let Json(request) = request?;
    let task = state
        .task_store
        .update_by_id_for_owner(&owner, &task_id, request.into())
        .await?;
    Ok(Json(TaskResponse::from(task)))
}

/// `DELETE /api/tasks/{id}`
///
/// # Errors
///
/// 404 under the same rule as [`get_task`].
pub async fn delete_task(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(id): Path<String>,
) -> Result<Json<DeleteTaskResponse>, ApiErrorResponse> {
    let task_id = parse_task_id(&id)?;
    let deleted = state
        .task_store
        .delete_by_id_for_owner(&owner, &task_id)
        .await?;
    Ok(Json(DeleteTaskResponse::deleted(deleted.to_string())))
}

// =============================================================================
// Service Handlers
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// `GET /health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /`
pub async fn root() -> &'static str {
    ROOT_BANNER
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("not-a-uuid")]
    #[case("123")]
    #[case("")]
    fn test_parse_task_id_malformed_is_not_found(#[case] raw: &str) {
        let error = parse_task_id(raw).unwrap_err();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.error.message, TASK_NOT_FOUND_MESSAGE);
    }

    #[rstest]
    fn test_parse_task_id_valid() {
        let id = TaskId::generate();
        assert_eq!(parse_task_id(&id.to_string()).unwrap(), id);
    }

    #[rstest]
    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "healthy");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
