/// Prefix of every rate-limited route.
pub const API_PREFIX: &str = "/api";

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// How often idle rate-limit keys are swept.
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 5 * 60;
