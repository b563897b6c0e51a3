//! Route configuration and setup

use crate::constants::API_PREFIX;
use crate::error::HttpAppError;
use crate::handlers;
use crate::middleware::{
    error_details_middleware, rate_limit_middleware, request_id_middleware,
    security_headers_middleware, ErrorDetailPolicy,
};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cutout_core::{AppError, Config};
use cutout_infra::{ErrorResponse, SecurityHeaders};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{self, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(state: AppState) -> Result<Router, anyhow::Error> {
    let config = state.config.clone();
    let cors = setup_cors(&config)?;

    let expose_details = !config.is_production();

    // Rate limiting covers matched methods on /api routes only; a wrong method falls
    // through to the 404 body without consuming quota
    let api_routes = Router::new()
        .route(
            "/remove-bg",
            post(handlers::remove_bg::remove_background)
                .route_layer(from_fn_with_state(
                    state.rate_limit.clone(),
                    rate_limit_middleware,
                ))
                .fallback(not_found),
        )
        .layer(DefaultBodyLimit::max(config.max_request_body_bytes));

    let app = Router::new()
        .route("/", get(handlers::health::health_check).fallback(not_found))
        .nest(API_PREFIX, api_routes)
        .fallback(not_found)
        .layer(from_fn_with_state(
            ErrorDetailPolicy {
                expose: expose_details,
            },
            error_details_middleware,
        ))
        .layer(CatchPanicLayer::custom(
            move |payload: Box<dyn Any + Send + 'static>| handle_panic(payload, expose_details),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(from_fn_with_state(
            SecurityHeaders {
                hsts: config.is_production(),
            },
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

async fn not_found() -> HttpAppError {
    HttpAppError(AppError::NotFound("Endpoint not found".to_string()))
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let message = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    tracing::error!(panic = %message, "Handler panicked");

    let error = if expose_details {
        message.to_string()
    } else {
        "Internal server error".to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::message(error)),
    )
        .into_response()
}

/// Setup CORS configuration
///
/// `*` allows any origin without credentials. Otherwise origins go through `OriginMatcher`.
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        return Ok(CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods(methods)
            .allow_headers(cors::Any));
    }

    let matcher = OriginMatcher::from_origins(&config.cors_origins)?;
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| matcher.allows(origin));

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
            header::RETRY_AFTER,
        ])
        .allow_credentials(true))
}

/// Allowed CORS origins.
///
/// Entries are matched exactly, except `*.example.app`, which admits any origin whose
/// host is a subdomain of `example.app` (not `example.app` itself).
#[derive(Debug, Clone)]
struct OriginMatcher {
    exact: Vec<HeaderValue>,
    suffixes: Vec<String>,
}

impl OriginMatcher {
    fn from_origins(origins: &[String]) -> Result<Self, anyhow::Error> {
        let mut exact = Vec::new();
        let mut suffixes = Vec::new();
        for origin in origins {
            if let Some(domain) = origin.strip_prefix("*.") {
                suffixes.push(format!(".{}", domain.to_lowercase()));
            } else {
                let value = origin
                    .parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))?;
                exact.push(value);
            }
        }
        Ok(Self { exact, suffixes })
    }

    fn allows(&self, origin: &HeaderValue) -> bool {
        if self.exact.iter().any(|o| o == origin) {
            return true;
        }
        origin
            .to_str()
            .ok()
            .and_then(origin_host)
            .map(|host| {
                self.suffixes
                    .iter()
                    .any(|suffix| host.ends_with(suffix.as_str()))
            })
            .unwrap_or(false)
    }
}

/// Lowercased host of an `http(s)://host[:port]` origin.
fn origin_host(origin: &str) -> Option<String> {
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))?;
    let host = rest.split(':').next()?;
    (!host.is_empty()).then(|| host.to_lowercase())
}
