//! HTTP error response body
//!
//! `IntoResponse` for `AppError` lives in cutout-api: the orphan rule forbids
//! implementing axum's trait for a cutout-core type here.

use serde::Serialize;

/// Standard error response format for the relay API
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable reason (e.g. `too-large`, `auth-failure`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Provider diagnostics; omitted in production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Body with only the `error` field.
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            recoverable: None,
            suggested_action: None,
            details: None,
        }
    }
}
