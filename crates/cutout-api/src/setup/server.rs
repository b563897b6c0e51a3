//! Server startup and graceful shutdown

use crate::constants::RATE_LIMIT_CLEANUP_INTERVAL_SECS;
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;

/// Start the server with graceful shutdown
pub async fn start_server(state: &AppState, app: Router) -> Result<()> {
    let config = &state.config;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let cleanup = spawn_rate_limit_cleanup(state);

    tracing::info!(
        provider = state.relay.provider_name(),
        max_file_mb = config.max_file_size_bytes / 1024 / 1024,
        content_types = %config.allowed_content_types.join(","),
        rate_limit = config.rate_limit.max_requests,
        rate_limit_window_secs = config.rate_limit.window.as_secs(),
        cors_origins = %config.cors_origins.join(","),
        "Server ready and accepting connections"
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    cleanup.abort();
    cutout_infra::shutdown_telemetry().await;

    served.context("Server error")
}

/// Periodically drop idle rate-limit keys so memory tracks active clients only.
fn spawn_rate_limit_cleanup(state: &AppState) -> tokio::task::JoinHandle<()> {
    let limiter = state.rate_limit.limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_INTERVAL_SECS));
        interval.tick().await;
        loop {
            interval.tick().await;
            limiter.cleanup_expired().await;
        }
    })
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
