//! Provider adapter core infrastructure
//!
//! This module provides the abstraction every background-removal integration
//! implements, plus the HTTP helpers adapters share to classify failures into the
//! common taxonomy.

use async_trait::async_trait;
use cutout_core::{FailureReason, ProviderFailure, ProviderResult, UploadedFile};
use std::fmt::Debug;
use std::time::Duration;

/// Longest provider error body kept as diagnostic detail.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Trait that all background-removal providers must implement
///
/// Implementations own the provider-specific request encoding and response decoding.
/// Every failure is returned as a classified [`ProviderFailure`]; raw provider error
/// shapes never leave the adapter.
#[async_trait]
pub trait BackgroundRemover: Send + Sync + Debug {
    /// Get the provider name/identifier
    fn name(&self) -> &str;

    /// Remove the background from `file`, suspending until the provider answers.
    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult;
}

/// HTTP client shared by an adapter for all of its round trips.
pub(crate) fn build_http_client(
    provider: &str,
    timeout: Duration,
) -> anyhow::Result<reqwest::Client> {
    use anyhow::Context;

    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .with_context(|| format!("Failed to create HTTP client for {}", provider))
}

/// Classify a transport-level error (no HTTP response was received).
pub(crate) fn classify_transport_error(err: &reqwest::Error) -> ProviderFailure {
    let reason = if err.is_timeout() {
        FailureReason::Timeout
    } else if err.is_connect() {
        FailureReason::UpstreamUnavailable
    } else if let Some(status) = err.status() {
        FailureReason::from_status(status.as_u16())
    } else {
        FailureReason::Unknown
    };

    ProviderFailure {
        reason,
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
    }
}

/// Build a classified failure from a non-success provider response, keeping the body
/// (truncated) as the diagnostic message.
pub(crate) async fn failure_from_response(response: reqwest::Response) -> ProviderFailure {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    ProviderFailure::from_status(status, truncate(&body, MAX_ERROR_BODY_CHARS))
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

/// Content type from a response header, defaulting to PNG.
pub(crate) fn response_content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| cutout_core::models::normalize_mime_type(v))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "image/png".to_string())
}
