//! AI Task Assistant backend.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `postgres`
//! - `DATABASE_URL`: `PostgreSQL` connection URL (required when `STORAGE_MODE=postgres`)
//! - `AUTH_TOKENS`: accepted bearer tokens as `token=owner` pairs, comma separated
//! - `GEMINI_API_KEY`: model provider key; without it every AI call uses the fallback
//! - `GEMINI_MODEL`, `GEMINI_BASE_URL`, `AI_TIMEOUT_MS`: provider tuning
//! - `RUST_LOG`: Logging level (e.g., `debug`, `info`, `task_assistant_api=debug`)
//! - `LOG_FORMAT`: `json` for structured JSON logs, anything else for text
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `5000`)
//! - `WORKER_THREADS`: Number of tokio worker threads (default: logical CPU count)

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_assistant_api::api::{AppState, create_router};
use task_assistant_api::domain::SystemClock;
use task_assistant_api::infrastructure::{AppConfig, RepositoryFactory};

/// Reads `WORKER_THREADS`, capped at four threads per logical CPU.
fn parse_worker_threads() -> Option<usize> {
    let max_threads = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get().saturating_mul(4))
        .unwrap_or(64);
    worker_threads(std::env::var("WORKER_THREADS").ok().as_deref(), max_threads)
}

/// `None` means the runtime default. Invalid values warn on stderr, since
/// tracing is not initialized before the runtime exists.
fn worker_threads(value: Option<&str>, max_threads: usize) -> Option<usize> {
    let trimmed = value.map(str::trim).filter(|value| !value.is_empty())?;

    match trimmed.parse::<usize>() {
        Ok(0) => {
            eprintln!("Warning: WORKER_THREADS=0 is invalid (must be > 0), using default");
            None
        }
        Ok(n) if n > max_threads => {
            eprintln!(
                "Warning: WORKER_THREADS={n} exceeds limit ({max_threads}), capping to {max_threads}"
            );
            Some(max_threads)
        }
        Ok(n) => Some(n),
        Err(error) => {
            eprintln!(
                "Warning: WORKER_THREADS='{trimmed}' is not a valid number ({error}), using default"
            );
            None
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();

    if let Some(threads) = parse_worker_threads() {
        builder.worker_threads(threads);
    }

    let runtime = builder.build().expect("Failed to create tokio runtime");
    runtime.block_on(async_main());
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .is_ok_and(|format| format.trim().eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_assistant_api=debug,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn async_main() {
    init_tracing();

    tracing::info!("Starting AI Task Assistant backend");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "Configuration error");
            std::process::exit(1);
        }
    };

    tracing::info!(
        storage_mode = %config.repository.storage_mode,
        tokens = config.credentials.len(),
        ai_model = %config.ai.model,
        "Configuration loaded"
    );
    if config.credentials.is_empty() {
        tracing::warn!("AUTH_TOKENS is empty; every task request will be rejected with 401");
    }
    if config.ai.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; AI endpoints will answer with the fallback");
    }

    let factory = RepositoryFactory::new(config.repository.clone());
    let repositories = match factory.create().await {
        Ok(repositories) => {
            tracing::info!("Repositories initialized successfully");
            repositories
        }
        Err(error) => {
            tracing::error!(%error, "Failed to initialize repositories");
            std::process::exit(1);
        }
    };

    let state = AppState::from_config(repositories, &config, Arc::new(SystemClock));
    let application = create_router(state);

    let address = match config.server.socket_address() {
        Ok(address) => address,
        Err(error) => {
            tracing::error!(%error, "Invalid server address");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, "Failed to bind to address {}", address);
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(address) => tracing::info!("Listening on {}", address),
        Err(error) => tracing::warn!(%error, "Could not determine local address"),
    }

    if let Err(error) = axum::serve(listener, application)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(%error, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

/// Completes on Ctrl+C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("   "), None)]
    #[case(Some("0"), None)]
    #[case(Some("abc"), None)]
    #[case(Some("-2"), None)]
    #[case(Some("4"), Some(4))]
    #[case(Some(" 8 "), Some(8))]
    #[case(Some("16"), Some(16))]
    #[case(Some("1000"), Some(16))]
    fn test_worker_threads(#[case] value: Option<&str>, #[case] expected: Option<usize>) {
        assert_eq!(worker_threads(value, 16), expected);
    }
}
