//! Helpers shared by the `cutout` binary.

use cutout_client::pipeline::suggested_save_name;
use cutout_client::DEFAULT_API_URL;
use std::path::{Path, PathBuf};

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays clean.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// `--api-url`, then `CUTOUT_API_URL`, then the local development server.
pub fn resolve_api_url(flag: Option<String>, env_value: Option<String>) -> String {
    flag.or(env_value)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Where to write the result: `--output` when given, otherwise a timestamped name
/// next to the input file.
pub fn resolve_output(output: Option<PathBuf>, input: &Path) -> PathBuf {
    output.unwrap_or_else(|| {
        input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(suggested_save_name())
    })
}
