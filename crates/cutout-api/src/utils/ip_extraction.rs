//! Client IP extraction for rate-limit keys
//!
//! Proxies append the address they received a connection from to `X-Forwarded-For`,
//! so with N trusted proxies in front of the relay the client is the N-th entry from
//! the right. Entries further left are caller-controlled and never trusted.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Extract the client IP from request headers, falling back to the socket address.
///
/// Returns `"unknown"` when nothing usable is available.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| from_forwarded_for(v, trusted_proxy_count));
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Pick the entry appended by the outermost trusted proxy.
///
/// A chain shorter than the trusted proxy count means the request skipped some
/// proxies; the leftmost entry is the best remaining guess.
fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let idx = ips.len().saturating_sub(trusted_proxy_count);
    ips.get(idx)?.parse().ok()
}
