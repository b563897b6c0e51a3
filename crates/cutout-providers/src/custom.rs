//! Self-hosted background-removal service
//!
//! `POST {base}/remove-bg` with the upload in a multipart `image` field; the service
//! answers with a JSON envelope carrying the result as a PNG data URI.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use cutout_core::config::ProviderSettings;
use cutout_core::{FailureReason, ProviderFailure, ProviderOutput, ProviderResult, UploadedFile};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::provider::{
    build_http_client, classify_transport_error, failure_from_response, BackgroundRemover,
};

pub struct CustomProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl Debug for CustomProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("CustomProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RemoveBgEnvelope {
    image: String,
    #[serde(default)]
    cached: Option<bool>,
}

/// Split a `data:<mime>;base64,<payload>` URI into its MIME type and decoded bytes.
fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), ProviderFailure> {
    let malformed = |what: &str| {
        ProviderFailure::new(
            FailureReason::Unknown,
            format!("Malformed image in provider response: {}", what),
        )
    };

    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| malformed("missing data: prefix"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed("missing payload separator"))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| malformed("payload is not base64"))?;

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| malformed(&e.to_string()))?;

    let mime = if mime.is_empty() { "image/png" } else { mime };
    Ok((cutout_core::models::normalize_mime_type(mime), data))
}

impl CustomProvider {
    pub fn new(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Custom provider API key is required but not provided"))?;

        Ok(Self {
            http_client: build_http_client("custom provider", settings.timeout)?,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BackgroundRemover for CustomProvider {
    fn name(&self) -> &str {
        "custom"
    }

    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ProviderFailure::new(FailureReason::InvalidInput, e.to_string()))?;

        let response = self
            .http_client
            .post(format!("{}/remove-bg", self.base_url))
            .header("X-API-Key", &self.api_key)
            .multipart(Form::new().part("image", part))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let envelope: RemoveBgEnvelope = response.json().await.map_err(|e| {
            if e.is_timeout() {
                classify_transport_error(&e)
            } else {
                ProviderFailure::new(
                    FailureReason::Unknown,
                    format!("Failed to parse provider response: {}", e),
                )
            }
        })?;

        let (content_type, data) = decode_data_uri(&envelope.image)?;

        tracing::info!(
            output_bytes = data.len(),
            cached = ?envelope.cached,
            "Custom provider background removal completed"
        );

        let mut output = ProviderOutput::new(data, content_type);
        output.cache_hit = envelope.cached;
        Ok(output)
    }
}
