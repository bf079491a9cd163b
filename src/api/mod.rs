//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.

pub mod ai;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

pub use auth::AuthenticatedOwner;
pub use dto::{
    ChatRequest, ChatResponse, CreateTaskRequest, DeleteTaskResponse, ProcessTaskRequest,
    ProcessTaskResponse, TaskResponse, UpdateTaskRequest,
};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use handlers::{AppState, HealthResponse, ROOT_BANNER};
pub use routes::create_router;
