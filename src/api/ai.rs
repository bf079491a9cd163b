//! HTTP handlers for the AI assistant endpoints.
//!
//! These endpoints are open; they neither read nor write tasks. Once the
//! request body is valid they always answer 200, with `source` telling
//! whether the provider or the local fallback produced the answer.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use super::dto::{ChatRequest, ChatResponse, ProcessTaskRequest, ProcessTaskResponse};
use super::error::ApiErrorResponse;
use super::handlers::AppState;

/// `POST /api/ai/process-task`
///
/// # Errors
///
/// 400 `description required` for a missing or blank description.
pub async fn process_task(
    State(state): State<AppState>,
    request: Result<Json<ProcessTaskRequest>, JsonRejection>,
) -> Result<Json<ProcessTaskResponse>, ApiErrorResponse> {
    let Json(request) = request?;
    let description = request.into_description()?;
    let outcome = state.assistant.suggest_task(&description).await;
    Ok(Json(outcome.into()))
}

/// `POST /api/ai/chat`
///
/// # Errors
///
/// 400 `message or messages required` when the body carries neither.
pub async fn chat(
    State(state): State<AppState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiErrorResponse> {
    let Json(request) = request?;
    let input = request.into_input()?;
    let outcome = state.assistant.chat(&input).await;
    Ok(Json(outcome.into()))
}
