//! Error types module
//!
//! All relay-visible failures are unified under the `AppError` enum. Provider failures
//! arrive already classified (`ProviderFailure`) and are mapped to HTTP status codes and
//! client messages here, so callers never see provider-specific error shapes.

use crate::models::{FailureReason, ProviderFailure};
use crate::validation::Rejection;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream outages
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "too-large")
    fn error_code(&self) -> &'static str;

    /// Whether a fresh request may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("Upload rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderFailure),

    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::NoFileUploaded => (
            400,
            "no-file",
            false,
            Some("Attach the image in a multipart field named 'file'"),
            false,
            LogLevel::Debug,
        ),
        AppError::Rejected(rejection) => (
            400,
            rejection.reason(),
            false,
            Some("Upload a JPEG, PNG or WebP image up to the size limit"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "too-large",
            false,
            Some("Reduce file size and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "invalid-request",
            false,
            Some("Check request format and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Provider(failure) => provider_failure_metadata(failure.reason),
        AppError::RateLimited(_) => (
            429,
            "rate-limited",
            true,
            Some("Wait for the rate limit window to reset"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotFound(_) => (404, "not-found", false, None, false, LogLevel::Debug),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "internal",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

fn provider_failure_metadata(
    reason: FailureReason,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match reason {
        FailureReason::InvalidInput => (
            400,
            "invalid-input",
            false,
            Some("Try a different image"),
            false,
            LogLevel::Debug,
        ),
        FailureReason::AuthFailure => (
            403,
            "auth-failure",
            false,
            Some("Check the provider API key configuration"),
            false,
            LogLevel::Error,
        ),
        FailureReason::QuotaExceeded => (
            402,
            "quota-exceeded",
            false,
            Some("Check the provider plan or wait for the quota to reset"),
            false,
            LogLevel::Error,
        ),
        FailureReason::RateLimited => (
            429,
            "provider-rate-limited",
            true,
            Some("Wait a moment and retry"),
            false,
            LogLevel::Warn,
        ),
        FailureReason::ProviderError => (
            500,
            "provider-error",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
        FailureReason::UpstreamUnavailable => (
            503,
            "upstream-unavailable",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        FailureReason::Timeout => (
            504,
            "timeout",
            true,
            Some("Try a smaller image"),
            false,
            LogLevel::Warn,
        ),
        FailureReason::Unknown => (
            500,
            "internal",
            true,
            Some("Retry after a short delay"),
            false,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::NoFileUploaded => "NoFileUploaded",
            AppError::Rejected(_) => "Rejected",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Provider(_) => "Provider",
            AppError::RateLimited(_) => "RateLimited",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        if let AppError::Provider(failure) = self {
            return failure.message.clone();
        }

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            // `#[error("...: {0}")]` variants already print their source
            let cause = err.to_string();
            if !details.contains(&cause) {
                details.push_str(&format!("\n  Caused by: {}", cause));
            }
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::NoFileUploaded => "No file uploaded".to_string(),
            AppError::Rejected(Rejection::UnsupportedType { .. }) => {
                "Invalid file type. Only JPEG, PNG, and WebP are allowed.".to_string()
            }
            AppError::Rejected(Rejection::TooLarge { max, .. }) => {
                format!("File too large. Maximum size is {}MB", max / 1024 / 1024)
            }
            AppError::PayloadTooLarge(_) => "File too large".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Provider(failure) => provider_client_message(failure.reason).to_string(),
            AppError::RateLimited(_) => "Too many requests, please try again later.".to_string(),
            AppError::NotFound(_) => "Endpoint not found".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

fn provider_client_message(reason: FailureReason) -> &'static str {
    match reason {
        FailureReason::InvalidInput => "Invalid image format or corrupted file",
        FailureReason::AuthFailure => "Invalid API key",
        FailureReason::QuotaExceeded => "API quota exceeded. Please check your plan or try again later",
        FailureReason::RateLimited => "Rate limit exceeded. Please try again in a moment",
        FailureReason::ProviderError => "AI processing error. Please try again",
        FailureReason::UpstreamUnavailable => "Service unavailable. Please try again later",
        FailureReason::Timeout => {
            "Request timeout. The AI processing took too long, please try a smaller image"
        }
        FailureReason::Unknown => "Internal server error",
    }
}
