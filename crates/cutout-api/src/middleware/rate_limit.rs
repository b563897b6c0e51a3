use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use cutout_core::AppError;
use cutout_infra::RateLimiter;
use std::net::SocketAddr;
use std::sync::Arc;

/// Limiter plus the proxy trust needed to key requests by client IP.
#[derive(Clone, Debug)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub trusted_proxy_count: usize,
}

/// HTTP rate limiting middleware
///
/// Keys requests by client IP and admits at most `max_requests` per sliding window.
/// Excess requests get `429` before reaching any handler, so no provider call is made.
///
/// # Headers
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: requests left in the current window
/// - `Retry-After`: seconds until a request will be admitted (429 only)
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        state.trusted_proxy_count,
    );
    let key = format!("ip:{}", ip);
    let limit = state.limiter.max_requests();

    match state.limiter.check(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_header(&mut response, "X-RateLimit-Limit", limit);
            set_header(&mut response, "X-RateLimit-Remaining", remaining);
            response
        }
        Err(retry_after) => {
            tracing::warn!(
                client = %key,
                path = %request.uri().path(),
                limit,
                retry_after_secs = retry_after.as_secs(),
                "Relay rate limit exceeded"
            );

            let mut response = HttpAppError(AppError::RateLimited(key)).into_response();
            set_header(&mut response, "X-RateLimit-Limit", limit);
            set_header(&mut response, "X-RateLimit-Remaining", 0);
            set_header(
                &mut response,
                "Retry-After",
                retry_after.as_secs_f64().ceil().max(1.0) as u64,
            );
            response
        }
    }
}

fn set_header(response: &mut Response, name: &'static str, value: impl ToString) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        response.headers_mut().insert(name, header_value);
    }
}
