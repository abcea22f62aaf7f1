//! Cache Aside - HTTP server binary
//!
//! Serves the cache engine over HTTP, backed by Redis when `REDIS_URL` is
//! set and by the in-memory store otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_aside::api::create_router;
use cache_aside::cache::{CacheEngine, StatsRecorder};
use cache_aside::store::RedisStore;
use cache_aside::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the backing store (Redis, or memory with a purge task)
/// 4. Create the cache engine and Axum router
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_aside=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, max_uncompressed_size={}, retries={}x{}ms, breaker_threshold={}, port={}",
        config.engine.default_ttl,
        config.engine.max_uncompressed_size,
        config.engine.max_retry_attempts,
        config.engine.retry_delay_ms,
        config.engine.circuit_failure_threshold,
        config.server_port
    );

    let (state, cleanup_handle) = match &config.redis_url {
        Some(url) => {
            // An unreachable server is logged, not fatal
            let store = RedisStore::connect(url)
                .await
                .context("Invalid REDIS_URL")?;
            let stats = Arc::new(StatsRecorder::new());
            let engine = CacheEngine::new(Arc::new(store), &config.engine, stats.clone());
            (AppState::new(engine, stats), None)
        }
        None => {
            let (state, store) = AppState::in_memory(&config.engine);
            info!("No REDIS_URL set, using in-memory store");
            let handle = spawn_cleanup_task(store, config.cleanup_interval);
            (state, Some(handle))
        }
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
