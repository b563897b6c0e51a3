//! HTTP client for the cutout relay.
//!
//! `RelayClient` sends one image to `POST /api/remove-bg` and hands back the PNG bytes,
//! or the server's JSON error payload. `pipeline` builds the client-side state machine
//! (select, preview, process, save) on top of it. The CLI uses both directly.

pub mod pipeline;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use pipeline::{ClientPipeline, ClientState, LocalRejection, Ticket};

pub const DEFAULT_API_URL: &str = "http://localhost:4000";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const FILE_FIELD: &str = "file";

/// Shown when the relay fails without a readable error payload.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to remove background. Your image may not have a background or is too complex. Please upload an image that is suitable for removing background.";

/// JSON error body returned by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorPayload {
    fn generic() -> Self {
        Self {
            error: GENERIC_FAILURE_MESSAGE.to_string(),
            code: None,
            details: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Relay answered with a non-2xx status.
    #[error("{} (HTTP {status})", .payload.error)]
    Server { status: u16, payload: ErrorPayload },

    #[error("Failed to reach the relay: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No processed image to save")]
    NothingToSave,
}

impl ClientError {
    /// Message to show the user: the server's own message when there is one.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Server { payload, .. } => payload.error.clone(),
            ClientError::Io { .. } | ClientError::NothingToSave => self.to_string(),
            ClientError::Transport(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// An image the user picked, held in memory.
#[derive(Clone)]
pub struct SelectedFile {
    pub data: Bytes,
    pub content_type: String,
    pub filename: String,
}

impl SelectedFile {
    pub fn new(
        data: impl Into<Bytes>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            filename: filename.into(),
        }
    }

    /// Read a local file; the MIME type is inferred from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        Ok(Self::new(data, mime_from_path(path), filename))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Health response from `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// HTTP client for the relay.
#[derive(Clone, Debug)]
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Client for `CUTOUT_API_URL`, falling back to the local development server.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            std::env::var("CUTOUT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload `file` and return the background-removed PNG.
    pub async fn remove_background(&self, file: &SelectedFile) -> Result<Bytes, ClientError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;

        let response = self
            .client
            .post(format!("{}/api/remove-bg", self.base_url))
            .multipart(Form::new().part(FILE_FIELD, part))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let payload = serde_json::from_str::<ErrorPayload>(&body)
                .unwrap_or_else(|_| ErrorPayload::generic());
            tracing::debug!(
                status = status.as_u16(),
                error = %payload.error,
                "Relay rejected background removal"
            );
            return Err(ClientError::Server {
                status: status.as_u16(),
                payload,
            });
        }

        Ok(response.bytes().await?)
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// One-shot upload against `base_url`.
pub async fn remove_background(file: &SelectedFile, base_url: &str) -> Result<Bytes, ClientError> {
    RelayClient::new(base_url)?.remove_background(file).await
}
