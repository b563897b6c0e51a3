//! Replicate provider for background removal
//!
//! Runs a hosted background-removal model on Replicate (default: `cjwbw/rembg`).
//! The upload is sent inline as a base64 data URI, the prediction is awaited (the API
//! is asked to hold the request open, then polled), and the resulting image is
//! downloaded from the output URL in a second round trip.

use async_trait::async_trait;
use bytes::Bytes;
use cutout_core::config::{ProviderSettings, REPLICATE_REMBG_VERSION};
use cutout_core::{FailureReason, ProviderFailure, ProviderOutput, ProviderResult, UploadedFile};
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::provider::{
    build_http_client, classify_transport_error, failure_from_response, response_content_type,
    BackgroundRemover,
};

const MAX_POLL_ATTEMPTS: u32 = 120;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Replicate provider implementation
pub struct ReplicateProvider {
    http_client: reqwest::Client,
    api_token: String,
    base_url: String,
    model_version: String,
    poll_interval: Duration,
}

impl Debug for ReplicateProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ReplicateProvider")
            .field("base_url", &self.base_url)
            .field("model_version", &self.model_version)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    output: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
    #[serde(default)]
    metrics: Option<PredictionMetrics>,
}

#[derive(Debug, Deserialize)]
struct PredictionMetrics {
    predict_time: Option<f64>,
}

impl PredictionResponse {
    /// Output URL: a plain string, or the first string of an array output.
    fn output_url(&self) -> Option<&str> {
        match self.output.as_ref()? {
            serde_json::Value::String(url) => Some(url.as_str()),
            serde_json::Value::Array(items) => items.iter().find_map(|v| v.as_str()),
            _ => None,
        }
    }

    fn error_message(&self) -> String {
        match &self.error {
            Some(serde_json::Value::String(msg)) => msg.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        }
    }
}

impl ReplicateProvider {
    pub fn new(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let api_token = settings
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Replicate API token is required but not provided"))?;

        Ok(Self {
            http_client: build_http_client("Replicate", settings.timeout)?,
            api_token,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model_version: settings
                .model_version
                .clone()
                .unwrap_or_else(|| REPLICATE_REMBG_VERSION.to_string()),
            poll_interval: POLL_INTERVAL,
        })
    }

    /// Override the delay between status polls.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Create a prediction on Replicate
    async fn create_prediction(
        &self,
        file: &UploadedFile,
    ) -> Result<PredictionResponse, ProviderFailure> {
        let url = format!("{}/predictions", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .header("Prefer", "wait")
            .json(&json!({
                "version": self.model_version,
                "input": {
                    "image": file.to_data_uri(),
                },
            }))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        response.json().await.map_err(|e| {
            ProviderFailure::new(
                FailureReason::ProviderError,
                format!("Failed to parse Replicate API response: {}", e),
            )
        })
    }

    /// Get prediction status
    async fn get_prediction(&self, prediction_id: &str) -> Result<PredictionResponse, ProviderFailure> {
        let url = format!("{}/predictions/{}", self.base_url, prediction_id);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        response.json().await.map_err(|e| {
            ProviderFailure::new(
                FailureReason::ProviderError,
                format!("Failed to parse prediction response: {}", e),
            )
        })
    }

    /// Wait for prediction to reach a terminal state
    async fn wait_for_prediction(
        &self,
        mut prediction: PredictionResponse,
    ) -> Result<PredictionResponse, ProviderFailure> {
        for attempt in 0..MAX_POLL_ATTEMPTS {
            match prediction.status.as_str() {
                "succeeded" => {
                    tracing::debug!(
                        prediction_id = %prediction.id,
                        polls = attempt,
                        "Replicate prediction completed"
                    );
                    return Ok(prediction);
                }
                "failed" => {
                    return Err(ProviderFailure::new(
                        FailureReason::ProviderError,
                        format!("Replicate prediction failed: {}", prediction.error_message()),
                    ));
                }
                "canceled" => {
                    return Err(ProviderFailure::new(
                        FailureReason::ProviderError,
                        "Replicate prediction was canceled",
                    ));
                }
                "starting" | "processing" => {
                    tracing::debug!(
                        prediction_id = %prediction.id,
                        attempt = attempt + 1,
                        status = %prediction.status,
                        "Waiting for Replicate prediction to complete"
                    );
                }
                other => {
                    tracing::warn!(
                        prediction_id = %prediction.id,
                        status = %other,
                        "Unknown prediction status"
                    );
                }
            }

            sleep(self.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;
        }

        Err(ProviderFailure::timeout(format!(
            "Replicate prediction did not finish after {} polls",
            MAX_POLL_ATTEMPTS
        )))
    }

    /// Download the output image.
    ///
    /// The prediction already succeeded at this point; any failure here except a timeout
    /// is reported as the upstream being unavailable.
    async fn download_output(&self, output_url: &str) -> Result<(Bytes, String), ProviderFailure> {
        let response = self
            .http_client
            .get(output_url)
            .send()
            .await
            .map_err(|e| {
                let failure = classify_transport_error(&e);
                if failure.reason == FailureReason::Timeout {
                    failure
                } else {
                    ProviderFailure::unavailable(format!(
                        "Failed to download output image: {}",
                        failure.message
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderFailure {
                reason: FailureReason::UpstreamUnavailable,
                status: Some(status.as_u16()),
                message: format!("Failed to download output image: {}", status),
            });
        }

        let content_type = response_content_type(&response);
        let data = response.bytes().await.map_err(|e| {
            let failure = classify_transport_error(&e);
            if failure.reason == FailureReason::Timeout {
                failure
            } else {
                ProviderFailure::unavailable(format!("Failed to read output image data: {}", e))
            }
        })?;

        Ok((data, content_type))
    }
}

#[async_trait]
impl BackgroundRemover for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult {
        let started = Instant::now();

        let prediction = self.create_prediction(file).await?;
        tracing::info!(
            prediction_id = %prediction.id,
            status = %prediction.status,
            "Replicate prediction created"
        );

        let prediction = self.wait_for_prediction(prediction).await?;

        let output_url = prediction.output_url().ok_or_else(|| {
            ProviderFailure::new(
                FailureReason::ProviderError,
                "No output URL in prediction response",
            )
        })?;

        let (data, content_type) = self.download_output(output_url).await?;

        tracing::info!(
            prediction_id = %prediction.id,
            predict_time = ?prediction.metrics.as_ref().and_then(|m| m.predict_time),
            output_bytes = data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Replicate background removal completed"
        );

        Ok(ProviderOutput::new(data, content_type))
    }
}
