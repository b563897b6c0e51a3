//! Provider-facing result types shared by every adapter.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

/// Classified reason for a provider failure.
///
/// Adapters translate their provider's specific error shapes into one of these
/// before anything reaches the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Provider rejected the image (unsupported format, corrupt data).
    InvalidInput,
    QuotaExceeded,
    AuthFailure,
    /// Provider throttled the relay.
    RateLimited,
    /// Provider accepted the call but failed internally.
    ProviderError,
    /// Provider unreachable, refusing connections or reporting 502/503.
    UpstreamUnavailable,
    Timeout,
    Unknown,
}

impl FailureReason {
    /// Classify an HTTP status returned by a provider.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 415 | 422 => FailureReason::InvalidInput,
            401 | 403 => FailureReason::AuthFailure,
            402 => FailureReason::QuotaExceeded,
            429 => FailureReason::RateLimited,
            500 => FailureReason::ProviderError,
            502 | 503 => FailureReason::UpstreamUnavailable,
            408 | 504 => FailureReason::Timeout,
            _ => FailureReason::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidInput => "invalid-input",
            FailureReason::QuotaExceeded => "quota-exceeded",
            FailureReason::AuthFailure => "auth-failure",
            FailureReason::RateLimited => "provider-rate-limited",
            FailureReason::ProviderError => "provider-error",
            FailureReason::UpstreamUnavailable => "upstream-unavailable",
            FailureReason::Timeout => "timeout",
            FailureReason::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure produced by an adapter.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct ProviderFailure {
    pub reason: FailureReason,
    /// HTTP status reported by the provider, when the failure came from a response.
    pub status: Option<u16>,
    /// Provider-supplied message or transport error text. Diagnostic only.
    pub message: String,
}

impl ProviderFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            status: None,
            message: message.into(),
        }
    }

    /// Failure derived from a non-success provider response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            reason: FailureReason::from_status(status),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Timeout, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureReason::UpstreamUnavailable, message)
    }
}

/// Image bytes returned by a provider.
#[derive(Clone)]
pub struct ProviderOutput {
    pub data: Bytes,
    pub content_type: String,
    /// Set when the provider reports serving the result from its own cache.
    pub cache_hit: Option<bool>,
}

impl ProviderOutput {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            cache_hit: None,
        }
    }
}

impl fmt::Debug for ProviderOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOutput")
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .field("cache_hit", &self.cache_hit)
            .finish()
    }
}

pub type ProviderResult = Result<ProviderOutput, ProviderFailure>;
