//! Data Transfer Objects for API requests and responses.
//!
//! The wire format is camelCase. Request DTOs accept any extra fields and
//! ignore them, which is how an `ownerId` in a body is made harmless. The
//! same types are used by the HTTP client in [`crate::client`].

use serde::{Deserialize, Serialize};

use crate::domain::{NewTask, Task, TaskPatch};
use crate::infrastructure::{AiOutcome, ChatInput, ChatMessage, ChatReply, TaskSuggestion};

use super::error::ValidationError;

// =============================================================================
// Task DTOs
// =============================================================================

/// Request DTO for creating a new task.
///
/// `title` is optional here so that a missing title is reported as a
/// validation error rather than a deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_deadline: Option<String>,
    /// `low`, `medium` or `high`. Kept as text so bad values get a 400.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(request: CreateTaskRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            summary: request.summary,
            category: request.category,
            predicted_deadline: request.predicted_deadline,
            priority: request.priority,
        }
    }
}

/// Request DTO for updating a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(request: UpdateTaskRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            summary: request.summary,
            category: request.category,
            predicted_deadline: request.predicted_deadline,
            completed: request.completed,
            priority: request.priority,
        }
    }
}

/// Response DTO for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub summary: String,
    pub category: String,
    pub predicted_deadline: String,
    pub completed: bool,
    pub priority: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last update.
    pub updated_at: String,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.task_id.to_string(),
            owner_id: task.owner_id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            summary: task.summary.clone(),
            category: task.category.clone(),
            predicted_deadline: task.predicted_deadline.clone(),
            completed: task.completed,
            priority: task.priority.as_str().to_string(),
            created_at: task.created_at.to_string(),
            updated_at: task.updated_at.to_string(),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self::from(&task)
    }
}

/// Confirmation returned by `DELETE /api/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    pub message: String,
    pub id: String,
}

impl DeleteTaskResponse {
    #[must_use]
    pub fn deleted(id: impl Into<String>) -> Self {
        Self {
            message: "Deleted".to_string(),
            id: id.into(),
        }
    }
}

// =============================================================================
// AI DTOs
// =============================================================================

/// Request DTO for `POST /api/ai/process-task`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProcessTaskRequest {
    /// Returns the description, or the validation error for a missing or
    /// blank one.
    ///
    /// # Errors
    ///
    /// `ValidationError` with message `description required`.
    pub fn into_description(self) -> Result<String, ValidationError> {
        self.description
            .filter(|description| !description.trim().is_empty())
            .ok_or_else(|| ValidationError::single("description", "description required"))
    }
}

/// Response DTO for `POST /api/ai/process-task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTaskResponse {
    pub summary: String,
    pub category: String,
    pub predicted_deadline: String,
    /// `model` or `fallback`.
    pub source: String,
}

impl From<AiOutcome<TaskSuggestion>> for ProcessTaskResponse {
    fn from(outcome: AiOutcome<TaskSuggestion>) -> Self {
        let source = outcome.source().to_string();
        let suggestion = outcome.into_inner();
        Self {
            summary: suggestion.summary,
            category: suggestion.category,
            predicted_deadline: suggestion.predicted_deadline,
            source,
        }
    }
}

/// Request DTO for `POST /api/ai/chat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
}

impl ChatRequest {
    /// Converts the request into assistant input. A non-empty `messages`
    /// history wins over `message`.
    ///
    /// # Errors
    ///
    /// `ValidationError` with message `message or messages required` when
    /// neither carries anything.
    pub fn into_input(self) -> Result<ChatInput, ValidationError> {
        match (self.messages, self.message) {
            (Some(messages), _) if !messages.is_empty() => Ok(ChatInput::History(messages)),
            (_, Some(message)) if !message.trim().is_empty() => Ok(ChatInput::Message(message)),
            _ => Err(ValidationError::single(
                "message",
                "message or messages required",
            )),
        }
    }
}

/// Response DTO for `POST /api/ai/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    /// `model` or `fallback`.
    pub source: String,
}

impl From<AiOutcome<ChatReply>> for ChatResponse {
    fn from(outcome: AiOutcome<ChatReply>) -> Self {
        let source = outcome.source().to_string();
        Self {
            reply: outcome.into_inner().reply,
            source,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, Priority, TaskId, Timestamp};
    use rstest::rstest;

    #[rstest]
    fn test_create_request_ignores_owner_fields() {
        let request: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "Fix bug",
            "priority": "high",
            "ownerId": "mallory",
            "userId": "mallory",
            "id": "spoofed"
        }))
        .unwrap();

        assert_eq!(request.title.as_deref(), Some("Fix bug"));
        assert_eq!(request.priority.as_deref(), Some("high"));
    }

    #[rstest]
    fn test_create_request_reads_camel_case() {
        let request: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "title": "t",
            "predictedDeadline": "2025-01-01"
        }))
        .unwrap();
        let fields = NewTask::from(request);
        assert_eq!(fields.predicted_deadline.as_deref(), Some("2025-01-01"));
    }

    #[rstest]
    fn test_update_request_null_means_absent() {
        let request: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({"completed": true, "title": null}))
                .unwrap();
        let patch = TaskPatch::from(request);
        assert_eq!(patch.completed, Some(true));
        assert!(patch.title.is_none());
    }

    #[rstest]
    fn test_update_request_rejects_wrong_types() {
        let result: Result<UpdateTaskRequest, _> =
            serde_json::from_value(serde_json::json!({"completed": "yes"}));
        assert!(result.is_err());
    }

    #[rstest]
    fn test_task_response_wire_shape() {
        let task = Task::new(
            TaskId::generate(),
            OwnerId::new("u1"),
            "Fix bug",
            Timestamp::now(),
        )
        .with_priority(Priority::High);

        let json = serde_json::to_value(TaskResponse::from(&task)).unwrap();

        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["category"], "Others");
        assert_eq!(json["predictedDeadline"], "");
        assert_eq!(json["completed"], false);
        assert!(json["createdAt"].is_string());
        assert!(json.get("owner_id").is_none());
    }

    #[rstest]
    #[case(ProcessTaskRequest::default())]
    #[case(ProcessTaskRequest { description: Some("   ".to_string()) })]
    fn test_process_task_request_requires_description(#[case] request: ProcessTaskRequest) {
        let error = request.into_description().unwrap_err();
        assert_eq!(error.errors[0].message, "description required");
    }

    #[rstest]
    fn test_chat_request_prefers_history() {
        let request = ChatRequest {
            message: Some("ignored".to_string()),
            messages: Some(vec![ChatMessage::new("user", "hello")]),
        };
        assert_eq!(
            request.into_input().unwrap(),
            ChatInput::History(vec![ChatMessage::new("user", "hello")])
        );
    }

    #[rstest]
    #[case(ChatRequest::default())]
    #[case(ChatRequest { message: Some(String::new()), messages: Some(Vec::new()) })]
    fn test_chat_request_requires_input(#[case] request: ChatRequest) {
        let error = request.into_input().unwrap_err();
        assert_eq!(error.errors[0].message, "message or messages required");
    }

    #[rstest]
    fn test_process_task_response_carries_source() {
        let response = ProcessTaskResponse::from(AiOutcome::FallbackUsed(TaskSuggestion {
            summary: "s".to_string(),
            category: "Other".to_string(),
            predicted_deadline: "2025-01-04".to_string(),
        }));
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["predictedDeadline"], "2025-01-04");
    }
}
