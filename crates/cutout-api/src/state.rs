//! Application state and sub-state extractors.

use crate::middleware::RateLimitState;
use crate::services::RelayService;
use axum::extract::FromRef;
use cutout_core::{Config, UploadValidator};
use cutout_infra::RateLimiter;
use cutout_providers::BackgroundRemover;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub relay: RelayService,
    pub rate_limit: RateLimitState,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the relay and an empty limiter from configuration around `provider`.
    pub fn new(config: Config, provider: Arc<dyn BackgroundRemover>) -> Self {
        let validator = UploadValidator::new(
            config.max_file_size_bytes,
            config.allowed_content_types.clone(),
        );
        let relay = RelayService::new(validator, provider, config.provider.timeout);

        let limiter = RateLimiter::with_shards(
            config.rate_limit.max_requests,
            config.rate_limit.window,
            config.rate_limit.shard_count,
        );
        let rate_limit = RateLimitState {
            limiter: Arc::new(limiter),
            trusted_proxy_count: config.rate_limit.trusted_proxy_count,
        };

        Self {
            relay,
            rate_limit,
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for RelayService {
    fn from_ref(state: &AppState) -> Self {
        state.relay.clone()
    }
}

impl FromRef<AppState> for RateLimitState {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limit.clone()
    }
}
