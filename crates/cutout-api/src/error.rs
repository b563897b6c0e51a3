//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`; `AppError` converts into it with `?` and
//! renders as `ErrorResponse` JSON with the status from its `ErrorMetadata`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cutout_core::{AppError, ErrorMetadata, LogLevel};
use cutout_infra::ErrorResponse;

/// Error body with diagnostics, attached to every rendered error response.
///
/// The body sent by default omits `details`; `error_details_middleware` swaps this
/// one in where the deployment exposes diagnostics.
#[derive(Debug, Clone)]
pub struct DetailedErrorBody(pub ErrorResponse);

/// Wrapper type for AppError to implement IntoResponse
///
/// Needed because of the orphan rule: `IntoResponse` and `AppError` are both foreign here.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, code, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, code, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type, code, "Request failed");
        }
    }
}

/// Build the JSON body for `error`.
pub fn error_body(error: &AppError, hide_details: bool) -> ErrorResponse {
    let details = if hide_details || error.is_sensitive() {
        None
    } else {
        Some(error.detailed_message())
    };

    ErrorResponse {
        error: error.client_message(),
        code: Some(error.error_code().to_string()),
        recoverable: Some(error.is_recoverable()),
        suggested_action: error.suggested_action().map(String::from),
        details,
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let mut response = (status, Json(error_body(app_error, true))).into_response();
        let detailed = error_body(app_error, false);
        if detailed.details.is_some() {
            response.extensions_mut().insert(DetailedErrorBody(detailed));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutout_core::{FailureReason, ProviderFailure};

    #[test]
    fn provider_details_shown_outside_production() {
        let err = AppError::Provider(ProviderFailure::from_status(403, "API Key invalid"));
        let body = error_body(&err, false);

        assert_eq!(body.error, "Invalid API key");
        assert_eq!(body.code.as_deref(), Some("auth-failure"));
        assert_eq!(body.details.as_deref(), Some("API Key invalid"));
    }

    #[test]
    fn details_hidden_in_production() {
        let err = AppError::Provider(ProviderFailure::new(
            FailureReason::ProviderError,
            "stack trace from provider",
        ));
        let body = error_body(&err, true);

        assert_eq!(body.error, "AI processing error. Please try again");
        assert!(body.details.is_none());
    }

    #[test]
    fn sensitive_errors_never_carry_details() {
        let err = AppError::Internal("database password wrong".to_string());
        let body = error_body(&err, false);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());
    }

    #[test]
    fn rendered_body_omits_details_but_keeps_them_aside() {
        let response =
            HttpAppError(AppError::Provider(ProviderFailure::from_status(403, "API Key invalid")))
                .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let DetailedErrorBody(detailed) = response
            .extensions()
            .get::<DetailedErrorBody>()
            .cloned()
            .unwrap();
        assert_eq!(detailed.details.as_deref(), Some("API Key invalid"));
    }

    #[test]
    fn sensitive_errors_carry_no_detailed_body() {
        let response = HttpAppError(AppError::Internal("db down".to_string())).into_response();
        assert!(response.extensions().get::<DetailedErrorBody>().is_none());
    }

    #[test]
    fn status_follows_metadata() {
        let response =
            HttpAppError(AppError::Provider(ProviderFailure::timeout("slow"))).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
