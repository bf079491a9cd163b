//! Generative-text adapter.
//!
//! [`AiAssistant`] never returns an error. Any provider failure, timeout or
//! unusable reply degrades to a locally computed value, and the result is
//! tagged with [`AiOutcome`] so callers can tell the two apart.
//!
//! # Provider protocol
//!
//! [`GeminiGenerator`] talks to the Gemini REST API:
//!
//! ```text
//! POST {base_url}/v1beta/models/{model}:generateContent
//! x-goog-api-key: {api_key}
//!
//! {"contents":[{"role":"user","parts":[{"text":"..."}]}]}
//! ```
//!
//! The reply text is the concatenation of the first candidate's parts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Clock;

use super::config::AiConfig;

/// Number of characters of the input kept as the fallback summary.
pub const FALLBACK_SUMMARY_CHARS: usize = 120;
/// Category used when the provider gives nothing usable.
pub const FALLBACK_CATEGORY: &str = "Other";
/// Days added to today for the fallback deadline.
pub const FALLBACK_DEADLINE_DAYS: u64 = 3;
/// Chat reply used when the provider gives nothing usable.
pub const CHAT_FALLBACK_REPLY: &str = "Sorry, AI is temporarily unavailable. Try again later or describe your request and I'll assist.";

/// Categories the provider is asked to choose from.
pub const SUGGESTED_CATEGORIES: [&str; 5] = ["Work", "Personal", "Bugfix", "Research", "Other"];

// =============================================================================
// Provider Error
// =============================================================================

/// Failures talking to the provider. These never leave this module's
/// public `AiAssistant` API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// No API key configured.
    #[error("AI provider is not configured")]
    NotConfigured,

    /// Failed to establish connection to the provider.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out after the specified duration.
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Provider answered with a non-success status.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Provider answered, but not with anything usable.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Outcome Types
// =============================================================================

/// Result of an assistant call: genuine provider output or a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutcome<T> {
    /// The provider replied and the reply was usable.
    Parsed(T),
    /// The value was computed locally.
    FallbackUsed(T),
}

impl<T> AiOutcome<T> {
    /// Returns the carried value regardless of where it came from.
    pub fn into_inner(self) -> T {
        match self {
            Self::Parsed(value) | Self::FallbackUsed(value) => value,
        }
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackUsed(_))
    }

    /// `"model"` or `"fallback"`, as reported on the wire.
    #[must_use]
    pub const fn source(&self) -> &'static str {
        match self {
            Self::Parsed(_) => "model",
            Self::FallbackUsed(_) => "fallback",
        }
    }
}

/// Structured suggestion for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestion {
    pub summary: String,
    pub category: String,
    pub predicted_deadline: String,
}

/// A chat answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// One turn of a chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// What the user said: a single message or a whole conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Message(String),
    History(Vec<ChatMessage>),
}

// =============================================================================
// Text Generator
// =============================================================================

/// How the provider should format its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
}

/// A source of generated text.
pub trait TextGenerator: Send + Sync {
    /// Generates a reply for `prompt`.
    fn generate(
        &self,
        prompt: String,
        format: ResponseFormat,
    ) -> BoxFuture<'static, Result<String, ProviderError>>;
}

/// Generator used when no provider is configured. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGenerator;

impl TextGenerator for UnavailableGenerator {
    fn generate(
        &self,
        _prompt: String,
        _format: ResponseFormat,
    ) -> BoxFuture<'static, Result<String, ProviderError>> {
        Box::pin(async { Err(ProviderError::NotConfigured) })
    }
}

/// Stub generator for tests. Returns a fixed result without real I/O.
#[derive(Debug, Clone)]
pub struct StubTextGenerator {
    result: Result<String, ProviderError>,
}

impl StubTextGenerator {
    /// A stub that replies with `text`.
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            result: Ok(text.into()),
        }
    }

    /// A stub that fails with `error`.
    #[must_use]
    pub const fn failing(error: ProviderError) -> Self {
        Self { result: Err(error) }
    }
}

impl TextGenerator for StubTextGenerator {
    fn generate(
        &self,
        _prompt: String,
        _format: ResponseFormat,
    ) -> BoxFuture<'static, Result<String, ProviderError>> {
        let result = self.result.clone();
        Box::pin(async move { result })
    }
}

// =============================================================================
// Gemini Generator
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let parts = self.candidates.into_iter().next()?.content?.parts;
        let text: String = parts.into_iter().filter_map(|part| part.text).collect();
        Some(text)
    }
}

/// Gemini-backed generator.
pub struct GeminiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiGenerator {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GeminiGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(
        &self,
        prompt: String,
        format: ResponseFormat,
    ) -> BoxFuture<'static, Result<String, ProviderError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint();
        let api_key = self.api_key.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            execute_generate_io(&client, &endpoint, &api_key, &prompt, format, timeout).await
        })
    }
}

#[allow(clippy::cast_possible_truncation)]
async fn execute_generate_io(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    prompt: &str,
    format: ResponseFormat,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let timeout_ms = timeout.as_millis() as u64;

    let body = GenerateContentRequest {
        contents: [RequestContent {
            role: "user",
            parts: [RequestPart { text: prompt }],
        }],
        generation_config: match format {
            ResponseFormat::Json => Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
            ResponseFormat::Text => None,
        },
    };

    let response = client
        .post(endpoint)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .timeout(timeout)
        .send()
        .await
        .map_err(|error| {
            if error.is_timeout() {
                ProviderError::Timeout(timeout_ms)
            } else if error.is_connect() {
                ProviderError::ConnectionFailed(error.to_string())
            } else {
                ProviderError::ServiceUnavailable(error.to_string())
            }
        })?;

    if !response.status().is_success() {
        return Err(ProviderError::ServiceUnavailable(format!(
            "HTTP {}",
            response.status()
        )));
    }

    let payload: GenerateContentResponse = response.json().await.map_err(|error| {
        if error.is_timeout() {
            ProviderError::Timeout(timeout_ms)
        } else {
            ProviderError::InvalidResponse(error.to_string())
        }
    })?;

    payload
        .into_text()
        .ok_or_else(|| ProviderError::InvalidResponse("no candidates".to_string()))
}

/// Builds the generator described by `config`.
///
/// Without an API key this is an [`UnavailableGenerator`].
#[must_use]
pub fn generator_from_config(config: &AiConfig) -> Arc<dyn TextGenerator> {
    match &config.api_key {
        Some(api_key) => Arc::new(GeminiGenerator::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key.clone(),
            config.timeout,
        )),
        None => Arc::new(UnavailableGenerator),
    }
}

// =============================================================================
// Prompts and Parsing
// =============================================================================

fn task_prompt(description: &str) -> String {
    format!(
        "You are a task planning assistant. Answer with a single JSON object and nothing else.\n\n\
         Task description:\n\"\"\"{description}\"\"\"\n\n\
         The object must have exactly these string fields:\n\
         - summary: a one-line summary of the task\n\
         - category: one of {categories}\n\
         - predictedDeadline: a reasonable due date formatted YYYY-MM-DD\n",
        categories = SUGGESTED_CATEGORIES.join(", "),
    )
}

fn chat_prompt(input: &ChatInput) -> String {
    match input {
        ChatInput::Message(message) => format!(
            "You are a helpful assistant. Reply concisely and helpfully.\n\nuser: {message}\nassistant:"
        ),
        ChatInput::History(messages) => {
            let conversation: Vec<String> = messages
                .iter()
                .map(|message| format!("{}: {}", message.role, message.content))
                .collect();
            format!(
                "You are a helpful assistant in a chat. Continue the conversation politely.\n\n{}\nassistant:",
                conversation.join("\n")
            )
        }
    }
}

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json` on the opening line.
    body.split_once('\n')
        .map_or(body, |(first_line, remainder)| {
            if first_line.trim().chars().all(char::is_alphanumeric) {
                remainder
            } else {
                body
            }
        })
        .trim()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    summary: Option<String>,
    category: Option<String>,
    predicted_deadline: Option<String>,
}

/// Parses provider text into a suggestion. All three fields must be present
/// non-empty strings.
fn parse_suggestion(text: &str) -> Option<TaskSuggestion> {
    let raw: RawSuggestion = serde_json::from_str(strip_code_fence(text)).ok()?;
    let non_empty = |value: Option<String>| {
        value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    Some(TaskSuggestion {
        summary: non_empty(raw.summary)?,
        category: non_empty(raw.category)?,
        predicted_deadline: non_empty(raw.predicted_deadline)?,
    })
}

/// The locally computed suggestion for `description`.
#[must_use]
pub fn fallback_suggestion(description: &str, today: NaiveDate) -> TaskSuggestion {
    let deadline = today
        .checked_add_days(Days::new(FALLBACK_DEADLINE_DAYS))
        .unwrap_or(today);
    TaskSuggestion {
        summary: description.chars().take(FALLBACK_SUMMARY_CHARS).collect(),
        category: FALLBACK_CATEGORY.to_string(),
        predicted_deadline: deadline.format("%Y-%m-%d").to_string(),
    }
}

// =============================================================================
// AI Assistant
// =============================================================================

/// Task suggestions and chat on top of a [`TextGenerator`].
#[derive(Clone)]
pub struct AiAssistant {
    generator: Arc<dyn TextGenerator>,
    clock: Arc<dyn Clock>,
}

impl AiAssistant {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self { generator, clock }
    }

    /// An assistant that always answers with fallbacks.
    #[must_use]
    pub fn offline(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(UnavailableGenerator), clock)
    }

    /// Suggests summary, category and deadline for a task description.
    pub async fn suggest_task(&self, description: &str) -> AiOutcome<TaskSuggestion> {
        let generated = self
            .generator
            .generate(task_prompt(description), ResponseFormat::Json)
            .await;

        let parsed = match generated {
            Ok(text) => parse_suggestion(&text).ok_or_else(|| {
                ProviderError::InvalidResponse("reply is not a complete suggestion".to_string())
            }),
            Err(error) => Err(error),
        };

        match parsed {
            Ok(suggestion) => {
                debug!(category = %suggestion.category, "AI suggestion parsed");
                AiOutcome::Parsed(suggestion)
            }
            Err(error) => {
                warn!(%error, "AI task suggestion failed, using fallback");
                AiOutcome::FallbackUsed(fallback_suggestion(description, self.clock.today()))
            }
        }
    }

    /// Answers a chat message or continues a conversation.
    pub async fn chat(&self, input: &ChatInput) -> AiOutcome<ChatReply> {
        let generated = self
            .generator
            .generate(chat_prompt(input), ResponseFormat::Text)
            .await
            .map(|text| text.trim().to_string())
            .and_then(|text| {
                if text.is_empty() {
                    Err(ProviderError::InvalidResponse("empty reply".to_string()))
                } else {
                    Ok(text)
                }
            });

        match generated {
            Ok(reply) => AiOutcome::Parsed(ChatReply { reply }),
            Err(error) => {
                warn!(%error, "AI chat failed, using fallback");
                AiOutcome::FallbackUsed(ChatReply {
                    reply: CHAT_FALLBACK_REPLY.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for AiAssistant {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AiAssistant")
            .field("generator", &"Arc<dyn TextGenerator>")
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
