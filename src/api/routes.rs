//! Route configuration for the task assistant API.
//!
//! # Routes
//!
//! | Method | Path | Auth | Handler |
//! |--------|------|------|---------|
//! | GET | / | no | `root` |
//! | GET | /health | no | `health_check` |
//! | GET | /api/tasks | yes | `list_tasks` |
//! | POST | /api/tasks | yes | `create_task` |
//! | GET | /api/tasks/{id} | yes | `get_task` |
//! | PUT, PATCH | /api/tasks/{id} | yes | `update_task` |
//! | DELETE | /api/tasks/{id} | yes | `delete_task` |
//! | POST | /api/ai/process-task | no | `ai::process_task` |
//! | POST | /api/ai/chat | no | `ai::chat` |

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::ai;
use super::handlers::{
    AppState, create_task, delete_task, get_task, health_check, list_tasks, root, update_task,
};

/// Creates the application router with all routes and middleware.
///
/// # Examples
///
/// ```ignore
/// let router = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
/// axum::serve(listener, router).await?;
/// ```
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        // Tasks (owner scoped)
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
        // Assistant
        .route("/api/ai/process-task", post(ai::process_task))
        .route("/api/ai/chat", post(ai::chat))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
