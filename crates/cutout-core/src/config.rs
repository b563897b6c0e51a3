//! Configuration module
//!
//! Process configuration read once at startup from the environment (a `.env` file is
//! loaded first when present): server, upload limits, relay rate limiting, and the
//! background-removal provider selection.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::validation::DEFAULT_ALLOWED_CONTENT_TYPES;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_FILE_SIZE_MB: usize = 10;
const RATE_LIMIT_MAX_REQUESTS: u32 = 50;
const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const RATE_LIMITER_SHARD_COUNT: usize = 16;
const TRUSTED_PROXY_COUNT: usize = 1;
const PROVIDER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

pub const REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";
/// `cjwbw/rembg` on Replicate.
pub const REPLICATE_REMBG_VERSION: &str =
    "fb8af171cfa1616ddcf1242c093f9c46bcada5ad4cf6f2fbe8b81b330ec5c003";
pub const REMOVE_BG_API_URL: &str = "https://api.remove.bg/v1.0/removebg";

/// Which external background-removal service the relay forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hosted inference model (Replicate): submit, await, then download the output URL.
    Replicate,
    /// remove.bg SaaS API: one multipart round trip returning image bytes.
    RemoveBg,
    /// Self-hosted service answering with a JSON envelope around a data URI.
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Replicate => "replicate",
            ProviderKind::RemoveBg => "remove_bg",
            ProviderKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "replicate" => Ok(ProviderKind::Replicate),
            "remove_bg" | "removebg" => Ok(ProviderKind::RemoveBg),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(anyhow::anyhow!(
                "Unknown PROVIDER '{}'. Expected one of: replicate, remove_bg, custom",
                other
            )),
        }
    }
}

/// Settings for the selected provider adapter.
#[derive(Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// API key or token. Never logged.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model version for hosted inference providers.
    pub model_version: Option<String>,
    /// Upper bound on one whole adapter call.
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            kind,
            api_key: Some(api_key.into()),
            base_url: base_url.into(),
            model_version: None,
            timeout: Duration::from_secs(PROVIDER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let key_var = match self.kind {
            ProviderKind::Replicate => "REPLICATE_API_TOKEN",
            ProviderKind::RemoveBg => "REMOVE_BG_API_KEY",
            ProviderKind::Custom => "CUSTOM_API_KEY",
        };

        match self.api_key.as_deref() {
            None | Some("") => {
                return Err(anyhow::anyhow!(
                    "{} must be set when PROVIDER={}",
                    key_var,
                    self.kind
                ))
            }
            Some(key) if is_placeholder_key(key) => {
                return Err(anyhow::anyhow!(
                    "{} appears to be invalid or a placeholder. Please provide a valid key.",
                    key_var
                ))
            }
            Some(_) => {}
        }

        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "A base URL is required for provider {} (CUSTOM_API_URL for the custom provider)",
                self.kind
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Provider URL must start with http:// or https://, got '{}'",
                self.base_url
            ));
        }

        if self.timeout.is_zero() {
            return Err(anyhow::anyhow!("PROVIDER_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_version", &self.model_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn is_placeholder_key(key: &str) -> bool {
    matches!(key, "your-api-key" | "your-api-token" | "changeme" | "r8_") || key.len() < 8
}

/// Relay rate limiting: at most `max_requests` per client key in any `window`.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub shard_count: usize,
    pub trusted_proxy_count: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            shard_count: RATE_LIMITER_SHARD_COUNT,
            trusted_proxy_count: TRUSTED_PROXY_COUNT,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub max_file_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    /// Transport-level ceiling on the whole request body (multipart envelope included).
    pub max_request_body_bytes: usize,
    pub rate_limit: RateLimitConfig,
    pub provider: ProviderSettings,
    /// `LOG_FORMAT=json` switches log output to one JSON object per line.
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let mut cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(frontend) = var("FRONTEND_URL") {
            let frontend = frontend.trim().trim_end_matches('/').to_string();
            if !cors_origins.contains(&frontend) {
                cors_origins.push(frontend);
            }
        }

        let max_file_size_mb = parse_or(var("MAX_FILE_SIZE_MB"), MAX_FILE_SIZE_MB);
        let max_file_size_bytes = megabytes("MAX_FILE_SIZE_MB", max_file_size_mb)?;

        let max_request_body_mb = parse_or(
            var("MAX_REQUEST_BODY_MB"),
            max_file_size_mb.saturating_mul(2),
        );
        let max_request_body_bytes = megabytes("MAX_REQUEST_BODY_MB", max_request_body_mb)?;

        let allowed_content_types = var("ALLOWED_CONTENT_TYPES")
            .map(|s| {
                s.split(',')
                    .map(|ct| ct.trim().to_lowercase())
                    .filter(|ct| !ct.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                DEFAULT_ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let rate_limit = RateLimitConfig {
            max_requests: parse_or(var("RATE_LIMIT_MAX_REQUESTS"), RATE_LIMIT_MAX_REQUESTS),
            window: Duration::from_secs(parse_or(
                var("RATE_LIMIT_WINDOW_SECS"),
                RATE_LIMIT_WINDOW_SECS,
            )),
            shard_count: parse_or(var("RATE_LIMITER_SHARD_COUNT"), RATE_LIMITER_SHARD_COUNT)
                .max(1),
            trusted_proxy_count: parse_or(var("TRUSTED_PROXY_COUNT"), TRUSTED_PROXY_COUNT),
        };

        let kind: ProviderKind = var("PROVIDER")
            .unwrap_or_else(|| "replicate".to_string())
            .parse()?;
        let timeout = Duration::from_secs(parse_or(
            var("PROVIDER_TIMEOUT_SECS"),
            PROVIDER_TIMEOUT_SECS,
        ));

        let provider = match kind {
            ProviderKind::Replicate => ProviderSettings {
                kind,
                api_key: var("REPLICATE_API_TOKEN"),
                base_url: var("REPLICATE_API_URL")
                    .unwrap_or_else(|| REPLICATE_API_BASE.to_string()),
                model_version: Some(
                    var("REPLICATE_MODEL_VERSION")
                        .unwrap_or_else(|| REPLICATE_REMBG_VERSION.to_string()),
                ),
                timeout,
            },
            ProviderKind::RemoveBg => ProviderSettings {
                kind,
                api_key: var("REMOVE_BG_API_KEY"),
                base_url: var("REMOVE_BG_API_URL")
                    .unwrap_or_else(|| REMOVE_BG_API_URL.to_string()),
                model_version: None,
                timeout,
            },
            ProviderKind::Custom => ProviderSettings {
                kind,
                api_key: var("CUSTOM_API_KEY"),
                base_url: var("CUSTOM_API_URL").unwrap_or_default(),
                model_version: None,
                timeout,
            },
        };

        let server_port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let log_json = var("LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Config {
            server_port,
            environment,
            cors_origins,
            max_file_size_bytes,
            allowed_content_types,
            max_request_body_bytes,
            rate_limit,
            provider,
            log_json,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.max_request_body_bytes < self.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_BODY_MB must be at least MAX_FILE_SIZE_MB"
            ));
        }

        if self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_CONTENT_TYPES must not be empty"));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(anyhow::anyhow!(
                "RATE_LIMIT_MAX_REQUESTS must be greater than 0"
            ));
        }

        if self.rate_limit.window.is_zero() {
            return Err(anyhow::anyhow!(
                "RATE_LIMIT_WINDOW_SECS must be greater than 0"
            ));
        }

        self.provider.validate()
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn megabytes(name: &str, mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", name, mb))
}
