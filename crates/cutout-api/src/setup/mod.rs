//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use cutout_core::Config;
use cutout_infra::LogFormat;

/// Initialize telemetry, the provider adapter and the router.
pub fn initialize_app(config: Config) -> Result<(AppState, axum::Router)> {
    cutout_infra::init_telemetry(
        "cutout-api",
        &config.environment,
        LogFormat::from_json_flag(config.log_json),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration, before any request is accepted
    config.validate().context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment,
        provider = %config.provider.kind,
        "Configuration loaded and validated successfully"
    );

    let provider = cutout_providers::build_provider(&config.provider)?;
    let state = AppState::new(config, provider);
    let router = routes::setup_routes(state.clone())?;

    Ok((state, router))
}
