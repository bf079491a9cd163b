//! API error handling.
//!
//! Every failure leaves the server as `{"code", "message", "details"?}` with
//! a matching status. Storage failures are reported with a fixed message;
//! their detail is logged by the task store, never sent to the client.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::application::{FieldViolation, TaskStoreError};

/// Message used for every 500 response.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";
/// Message used for every 401 response.
pub const UNAUTHORIZED_MESSAGE: &str = "Missing or invalid credentials";
/// Message used for every task 404 response.
pub const TASK_NOT_FOUND_MESSAGE: &str = "Task not found";

// =============================================================================
// API Error
// =============================================================================

/// API error structure for JSON responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional field-level errors for validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    /// Creates a new API error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error with field-level details.
    #[must_use]
    pub fn validation(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            code: "VALIDATION_ERROR".to_string(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Field-level error for validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field that failed validation.
    pub field: String,
    /// Error message for this field.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<FieldViolation> for FieldError {
    fn from(violation: FieldViolation) -> Self {
        Self::new(violation.field, violation.message)
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// API error response containing status code and error details.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Error details.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a new API error response.
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// Creates a 400 Bad Request response for validation errors.
    #[must_use]
    pub fn validation_error(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiError::validation(message, details),
        )
    }

    /// Creates a 401 Unauthorized response.
    ///
    /// The message is always the same so callers cannot tell which check
    /// failed.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ApiError::new("UNAUTHORIZED", UNAUTHORIZED_MESSAGE),
        )
    }

    /// Creates a 404 Not Found response.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
    }

    /// Creates a 500 Internal Server Error response.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("INTERNAL_ERROR", message),
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<TaskStoreError> for ApiErrorResponse {
    fn from(error: TaskStoreError) -> Self {
        match error {
            TaskStoreError::Validation(violations) => Self::validation_error(
                "Validation failed",
                violations.into_iter().map(FieldError::from).collect(),
            ),
            TaskStoreError::NotFound => Self::not_found(TASK_NOT_FOUND_MESSAGE),
            TaskStoreError::Storage(_) => Self::internal_error(INTERNAL_ERROR_MESSAGE),
        }
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::single("body", rejection.body_text()).into()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Validation error raised at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Field-level errors.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub const fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Creates a validation error with a single field error.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![FieldError::new(field, message)])
    }
}

impl From<ValidationError> for ApiErrorResponse {
    fn from(error: ValidationError) -> Self {
        let message = match error.errors.as_slice() {
            [only] => only.message.clone(),
            _ => "Validation failed".to_string(),
        };
        Self::validation_error(message, error.errors)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::RepositoryError;
    use rstest::rstest;

    #[rstest]
    fn test_api_error_validation() {
        let details = vec![FieldError::new("title", "Title is required")];
        let error = ApiError::validation("Validation failed", details);
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert_eq!(error.details.unwrap().len(), 1);
    }

    #[rstest]
    fn test_api_error_serialization_skips_empty_details() {
        let json = serde_json::to_value(ApiError::new("NOT_FOUND", "Task not found")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": "NOT_FOUND", "message": "Task not found"})
        );
    }

    #[rstest]
    fn test_unauthorized_is_uniform() {
        let response = ApiErrorResponse::unauthorized();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error.code, "UNAUTHORIZED");
        assert_eq!(response.error.message, UNAUTHORIZED_MESSAGE);
    }

    #[rstest]
    fn test_task_store_error_mapping() {
        let response: ApiErrorResponse = TaskStoreError::NotFound.into();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.error.code, "NOT_FOUND");

        let response: ApiErrorResponse = TaskStoreError::Validation(vec![FieldViolation {
            field: "priority",
            message: "bad".to_string(),
        }])
        .into();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.code, "VALIDATION_ERROR");
        assert_eq!(response.error.details.unwrap()[0].field, "priority");
    }

    #[rstest]
    fn test_storage_error_hides_detail() {
        let error = TaskStoreError::Storage(RepositoryError::DatabaseError(
            "password authentication failed for user admin".to_string(),
        ));
        let response: ApiErrorResponse = error.into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.code, "INTERNAL_ERROR");
        assert_eq!(response.error.message, "An internal error occurred");
        assert!(response.error.details.is_none());
    }

    #[rstest]
    fn test_single_validation_error_uses_field_message() {
        let response: ApiErrorResponse =
            ValidationError::single("description", "description required").into();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.message, "description required");
    }
}
