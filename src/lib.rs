//! # task-assistant-api
//!
//! Backend for an AI-assisted task manager.
//!
//! Authenticated users manage their own tasks over a JSON REST API. Every
//! task belongs to exactly one owner, and every read or write is scoped to
//! the caller. An assistant suggests a summary, category and deadline for a
//! task description and answers chat messages; when the model provider is
//! unavailable it answers with a deterministic local fallback.
//!
//! ## Layout
//!
//! - [`domain`]: task values, priorities and the clock
//! - [`application`]: the owner-scoped task store
//! - [`infrastructure`]: repositories, configuration, credentials and the
//!   model provider adapter
//! - [`api`]: axum handlers, DTOs, the auth guard and the router
//! - [`client`]: session storage and the HTTP and demo task clients

pub mod api;
pub mod application;
pub mod client;
pub mod domain;
pub mod infrastructure;
