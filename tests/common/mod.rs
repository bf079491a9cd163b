//! Common helpers for integration tests.
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate, and not every file uses every
//! helper.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use task_assistant_api::api::{AppState, create_router};
use task_assistant_api::application::TaskStore;
use task_assistant_api::domain::{Clock, FixedClock, OwnerId};
use task_assistant_api::infrastructure::{
    AiAssistant, InMemoryTaskRepository, StaticTokenVerifier, TextGenerator, UnavailableGenerator,
};

pub const TOKEN_U1: &str = "token-u1";
pub const TOKEN_U2: &str = "token-u2";

/// Start of every test clock.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

/// Clock that moves one second per reading, so creation order is visible
/// in timestamps.
pub fn test_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::stepping(test_now(), TimeDelta::seconds(1)))
}

pub fn test_credentials() -> StaticTokenVerifier {
    StaticTokenVerifier::new()
        .with_token(TOKEN_U1, OwnerId::new("u1"))
        .with_token(TOKEN_U2, OwnerId::new("u2"))
}

/// Router over an empty in-memory repository with no model provider.
pub fn test_app() -> Router {
    test_app_with_generator(Arc::new(UnavailableGenerator))
}

pub fn test_app_with_generator(generator: Arc<dyn TextGenerator>) -> Router {
    let clock = test_clock();
    let state = AppState::new(
        TaskStore::new(Arc::new(InMemoryTaskRepository::new()), Arc::clone(&clock)),
        AiAssistant::new(generator, clock),
        Arc::new(test_credentials()),
    );
    create_router(state)
}

// =============================================================================
// Request Helpers
// =============================================================================

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    raw_request(method, uri, token, body.to_string())
}

pub fn raw_request(method: &str, uri: &str, token: Option<&str>, body: String) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    with_token(builder, token).body(Body::from(body)).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    with_token(builder, token).body(Body::empty()).unwrap()
}

fn with_token(
    builder: axum::http::request::Builder,
    token: Option<&str>,
) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Sends a request and returns the status with the body as JSON. Empty
/// bodies become `Null`; non-JSON bodies become a JSON string.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Creates a task as `token` and returns the response body.
pub async fn create_task(app: &Router, token: &str, body: Value) -> Value {
    let (status, created) = send(app, json_request("POST", "/api/tasks", Some(token), &body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
    created
}
