//! Task clients: one talking to the REST API, one simulating it locally.
//!
//! The implementation is chosen up front through [`ClientMode`]. A backend
//! client that cannot reach the server reports [`ClientError::Transport`];
//! it never switches to local data on its own.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::session::{SessionError, SessionStore};
use crate::api::dto::{
    ChatRequest, ChatResponse, CreateTaskRequest, DeleteTaskResponse, ProcessTaskRequest,
    ProcessTaskResponse, TaskResponse, UpdateTaskRequest,
};
use crate::api::error::{ApiError, ApiErrorResponse, TASK_NOT_FOUND_MESSAGE};
use crate::application::TaskStore;
use crate::domain::{Clock, OwnerId, TaskId};
use crate::infrastructure::config::optional_value;
use crate::infrastructure::{AiAssistant, ChatInput, ConfigError, InMemoryTaskRepository};

/// Server used when `TASK_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Owner of every task created in demo mode.
pub const DEMO_OWNER_ID: &str = "demo-user";

const DEMO_ECHO_LIMIT: usize = 80;
const DEMO_ECHO_KEEP: usize = 77;

// =============================================================================
// Client Error
// =============================================================================

/// Errors surfaced by task clients.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// No session is stored, so there is no token to send.
    #[error("Not signed in")]
    NotAuthenticated,

    /// The server could not be reached or the exchange broke off.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server (or the demo store) rejected the request.
    #[error("Request rejected with status {status}: {}", .error.message)]
    Rejected { status: u16, error: ApiError },

    /// A successful response carried an unexpected body.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ApiErrorResponse> for ClientError {
    fn from(response: ApiErrorResponse) -> Self {
        Self::Rejected {
            status: response.status.as_u16(),
            error: response.error,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

// =============================================================================
// Task Client
// =============================================================================

/// Operations the front end performs against the task service.
pub trait TaskClient: Send + Sync {
    /// The signed-in user's tasks, newest first.
    fn list_tasks(&self) -> BoxFuture<'static, Result<Vec<TaskResponse>, ClientError>>;

    fn create_task(
        &self,
        request: CreateTaskRequest,
    ) -> BoxFuture<'static, Result<TaskResponse, ClientError>>;

    fn update_task(
        &self,
        id: &str,
        request: UpdateTaskRequest,
    ) -> BoxFuture<'static, Result<TaskResponse, ClientError>>;

    fn delete_task(&self, id: &str) -> BoxFuture<'static, Result<DeleteTaskResponse, ClientError>>;

    /// Asks the assistant for summary, category and deadline.
    fn suggest(&self, description: &str)
    -> BoxFuture<'static, Result<ProcessTaskResponse, ClientError>>;

    fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<ChatResponse, ClientError>>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// Client for the REST API. Task calls carry the stored session's token.
#[derive(Clone)]
pub struct HttpTaskClient {
    http: reqwest::Client,
    base_url: String,
    sessions: Arc<dyn SessionStore>,
}

impl HttpTaskClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, sessions: Arc<dyn SessionStore>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, sessions)
    }

    #[must_use]
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            sessions,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl std::fmt::Debug for HttpTaskClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpTaskClient")
            .field("base_url", &self.base_url)
            .field("sessions", &"Arc<dyn SessionStore>")
            .finish_non_exhaustive()
    }
}

async fn bearer_token(sessions: &dyn SessionStore) -> Result<String, ClientError> {
    sessions
        .read()
        .await?
        .map(|session| session.token)
        .ok_or(ClientError::NotAuthenticated)
}

/// Anything that is not a task id is answered the way the server would,
/// with a 404.
fn parse_task_id(raw: &str) -> Result<TaskId, ClientError> {
    raw.parse()
        .map_err(|_| ApiErrorResponse::not_found(TASK_NOT_FOUND_MESSAGE).into())
}

/// Decodes a success body, or turns an error body into
/// [`ClientError::Rejected`].
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let error = response.json::<ApiError>().await.unwrap_or_else(|_| {
        ApiError::new(
            "HTTP_ERROR",
            status.canonical_reason().unwrap_or("Request failed"),
        )
    });
    Err(ClientError::Rejected {
        status: status.as_u16(),
        error,
    })
}

impl TaskClient for HttpTaskClient {
    fn list_tasks(&self) -> BoxFuture<'static, Result<Vec<TaskResponse>, ClientError>> {
        let client = self.clone();
        Box::pin(async move {
            let token = bearer_token(client.sessions.as_ref()).await?;
            let response = client
                .http
                .get(client.url("/api/tasks"))
                .bearer_auth(token)
                .send()
                .await?;
            decode(response).await
        })
    }

    fn create_task(
        &self,
        request: CreateTaskRequest,
    ) -> BoxFuture<'static, Result<TaskResponse, ClientError>> {
        let client = self.clone();
        Box::pin(async move {
            let token = bearer_token(client.sessions.as_ref()).await?;
            let response = client
                .http
                .post(client.url("/api/tasks"))
                .bearer_auth(token)
                .json(&request)
                .send()
                .await?;
            decode(response).await
        })
    }

    fn update_task(
        &self,
        id: &str,
        request: UpdateTaskRequest,
    ) -> BoxFuture<'static, Result<TaskResponse, ClientError>> {
        let client = self.clone();
        let task_id = parse_task_id(id);
        Box::pin(async move {
            let token = bearer_token(client.sessions.as_ref()).await?;
            let path = format!("/api/tasks/{}", task_id?);
            let response = client
                .http
                .put(client.url(&path))
                .bearer_auth(token)
                .json(&request)
                .send()
                .await?;
            decode(response).await
        })
    }

    fn delete_task(&self, id: &str) -> BoxFuture<'static, Result<DeleteTaskResponse, ClientError>> {
        let client = self.clone();
        let task_id = parse_task_id(id);
        Box::pin(async move {
            let token = bearer_token(client.sessions.as_ref()).await?;
            let path = format!("/api/tasks/{}", task_id?);
            let response = client
                .http
                .delete(client.url(&path))
                .bearer_auth(token)
                .send()
                .await?;
            decode(response).await
        })
    }

    fn suggest(
        &self,
        description: &str,
    ) -> BoxFuture<'static, Result<ProcessTaskResponse, ClientError>> {
        let client = self.clone();
        let request = ProcessTaskRequest {
            description: Some(description.to_string()),
        };
        Box::pin(async move {
            let response = client
                .http
                .post(client.url("/api/ai/process-task"))
                .json(&request)
                .send()
                .await?;
            decode(response).await
        })
    }

    fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<ChatResponse, ClientError>> {
        let client = self.clone();
        Box::pin(async move {
            let response = client
                .http
                .post(client.url("/api/ai/chat"))
                .json(&request)
                .send()
                .await?;
            decode(response).await
        })
    }
}

// =============================================================================
// Demo Client
// =============================================================================

/// Local stand-in for the backend.
///
/// Tasks live in memory under [`DEMO_OWNER_ID`] and follow the same
/// validation as the server. Suggestions come from the deterministic
/// fallback; chat echoes the user.
#[derive(Debug, Clone)]
pub struct DemoTaskClient {
    store: TaskStore,
    assistant: AiAssistant,
    owner: OwnerId,
}

impl DemoTaskClient {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TaskStore::new(
                Arc::new(InMemoryTaskRepository::new()),
                Arc::clone(&clock),
            ),
            assistant: AiAssistant::offline(clock),
            owner: OwnerId::new(DEMO_OWNER_ID),
        }
    }
}

/// Builds the demo chat reply from the latest thing the user said.
#[must_use]
pub fn demo_chat_reply(input: &ChatInput) -> String {
    let said = match input {
        ChatInput::Message(message) => message.as_str(),
        ChatInput::History(messages) => messages
            .iter()
            .rev()
            .find(|message| message.role == "user")
            .or_else(|| messages.last())
            .map_or("", |message| message.content.as_str()),
    };
    let said = said.trim();
    let echoed = if said.chars().count() > DEMO_ECHO_LIMIT {
        format!("{}...", said.chars().take(DEMO_ECHO_KEEP).collect::<String>())
    } else {
        said.to_string()
    };
    format!(
        "Demo AI: I heard you say \"{echoed}\". Tell me more or ask a specific question and I'll try to help."
    )
}

impl TaskClient for DemoTaskClient {
    fn list_tasks(&self) -> BoxFuture<'static, Result<Vec<TaskResponse>, ClientError>> {
        let client = self.clone();
        Box::pin(async move {
            let tasks = client
                .store
                .list_by_owner(&client.owner)
                .await
                .map_err(ApiErrorResponse::from)?;
            Ok(tasks.iter().map(TaskResponse::from).collect())
        })
    }

    fn create_task(
        &self,
        request: CreateTaskRequest,
    ) -> BoxFuture<'static, Result<TaskResponse, ClientError>> {
        let client = self.clone();
        Box::pin(async move {
            let task = client
                .store
                .create(&client.owner, request.into())
                .await
                .map_err(ApiErrorResponse::from)?;
            Ok(TaskResponse::from(task))
        })
    }

    fn update_task(
        &self,
        id: &str,
        request: UpdateTaskRequest,
    ) -> BoxFuture<'static, Result<TaskResponse, ClientError>> {
        let client = self.clone();
        let task_id = parse_task_id(id);
        Box::pin(async move {
            let task = client
                .store
                .update_by_id_for_owner(&client.owner, &task_id?, request.into())
                .await
                .map_err(ApiErrorResponse::from)?;
            Ok(TaskResponse::from(task))
        })
    }

    fn delete_task(&self, id: &str) -> BoxFuture<'static, Result<DeleteTaskResponse, ClientError>> {
        let client = self.clone();
        let task_id = parse_task_id(id);
        Box::pin(async move {
            let deleted = client
                .store
                .delete_by_id_for_owner(&client.owner, &task_id?)
                .await
                .map_err(ApiErrorResponse::from)?;
            Ok(DeleteTaskResponse::deleted(deleted.to_string()))
        })
    }

    fn suggest(
        &self,
        description: &str,
    ) -> BoxFuture<'static, Result<ProcessTaskResponse, ClientError>> {
        let assistant = self.assistant.clone();
        let request = ProcessTaskRequest {
            description: Some(description.to_string()),
        };
        Box::pin(async move {
            let description = request
                .into_description()
                .map_err(ApiErrorResponse::from)?;
            Ok(assistant.suggest_task(&description).await.into())
        })
    }

    fn chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<ChatResponse, ClientError>> {
        Box::pin(async move {
            let input = request.into_input().map_err(ApiErrorResponse::from)?;
            Ok(ChatResponse {
                reply: demo_chat_reply(&input),
                source: "fallback".to_string(),
            })
        })
    }
}

// =============================================================================
// Client Mode
// =============================================================================

/// Which [`TaskClient`] implementation to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMode {
    /// Talk to the REST API at `base_url`.
    Backend { base_url: String },
    /// Simulate the backend in memory.
    Demo,
}

impl Default for ClientMode {
    fn default() -> Self {
        Self::Backend {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl ClientMode {
    /// Loads the mode from `TASK_CLIENT_MODE` and `TASK_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown mode.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the mode through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an unknown mode.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = optional_value(&lookup, "TASK_CLIENT_MODE")
            .unwrap_or_else(|| "backend".to_string())
            .to_lowercase();
        match mode.as_str() {
            "backend" => Ok(Self::Backend {
                base_url: optional_value(&lookup, "TASK_API_URL")
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            }),
            "demo" => Ok(Self::Demo),
            other => Err(ConfigError::InvalidValue {
                key: "TASK_CLIENT_MODE".to_string(),
                message: format!("'{other}': expected 'backend' or 'demo'"),
            }),
        }
    }
}

/// Builds the client for `mode`. The session store is only consulted in
/// backend mode.
#[must_use]
pub fn build_client(
    mode: &ClientMode,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
) -> Arc<dyn TaskClient> {
    match mode {
        ClientMode::Backend { base_url } => {
            tracing::debug!(base_url = %base_url, "Using backend task client");
            Arc::new(HttpTaskClient::new(base_url.clone(), sessions))
        }
        ClientMode::Demo => {
            tracing::debug!("Using demo task client");
            Arc::new(DemoTaskClient::new(clock))
        }
    }
}
