//! remove.bg provider
//!
//! Single multipart round trip: the upload goes out as `image_file`, the response body
//! is the cut-out image.

use async_trait::async_trait;
use cutout_core::config::ProviderSettings;
use cutout_core::{FailureReason, ProviderFailure, ProviderOutput, ProviderResult, UploadedFile};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::provider::{
    build_http_client, classify_transport_error, response_content_type, truncate,
    BackgroundRemover,
};

pub struct RemoveBgProvider {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl Debug for RemoveBgProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RemoveBgProvider")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Error envelope returned by remove.bg on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    title: String,
    #[serde(default)]
    detail: Option<String>,
}

impl RemoveBgProvider {
    pub fn new(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("remove.bg API key is required but not provided"))?;

        Ok(Self {
            http_client: build_http_client("remove.bg", settings.timeout)?,
            api_key,
            api_url: settings.base_url.clone(),
        })
    }

    fn form_for(file: &UploadedFile) -> Result<Form, ProviderFailure> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                ProviderFailure::new(
                    FailureReason::InvalidInput,
                    format!("Invalid content type '{}': {}", file.content_type, e),
                )
            })?;

        Ok(Form::new().part("image_file", part).text("size", "auto"))
    }
}

/// Prefer the provider's own error titles over the raw body.
fn error_details(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .iter()
            .map(|e| match &e.detail {
                Some(detail) => format!("{}: {}", e.title, detail),
                None => e.title.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => truncate(body, 512),
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgProvider {
    fn name(&self) -> &str {
        "remove_bg"
    }

    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult {
        let form = Self::form_for(file)?;

        let response = self
            .http_client
            .post(&self.api_url)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = ProviderFailure::from_status(status.as_u16(), error_details(&body));
            tracing::warn!(
                status = status.as_u16(),
                reason = %failure.reason,
                "remove.bg request failed"
            );
            return Err(failure);
        }

        let credits = response
            .headers()
            .get("x-credits-charged")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = response_content_type(&response);
        let data = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        tracing::info!(
            output_bytes = data.len(),
            credits_charged = credits.as_deref().unwrap_or("unknown"),
            "remove.bg background removal completed"
        );

        Ok(ProviderOutput::new(data, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutout_core::ProviderKind;
    use mockito::Matcher;
    use std::time::Duration;

    fn provider_for(server: &mockito::ServerGuard) -> RemoveBgProvider {
        let settings = ProviderSettings::new(
            ProviderKind::RemoveBg,
            "rbg_test_key",
            format!("{}/v1.0/removebg", server.url()),
        )
        .with_timeout(Duration::from_secs(5));
        RemoveBgProvider::new(&settings).unwrap()
    }

    fn upload() -> UploadedFile {
        UploadedFile::new(b"fake-jpeg-bytes".to_vec(), "image/jpeg", "portrait.jpg")
    }

    #[tokio::test]
    async fn sends_multipart_and_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1.0/removebg")
            .match_header("x-api-key", "rbg_test_key")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image_file"; filename="portrait.jpg""#.to_string()),
                Matcher::Regex(r#"name="size""#.to_string()),
                Matcher::Regex("auto".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89u8, b'P', b'N', b'G'])
            .create_async()
            .await;

        let output = provider_for(&server)
            .remove_background(&upload())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(output.data.as_ref(), &[0x89u8, b'P', b'N', b'G']);
        assert_eq!(output.content_type, "image/png");
        assert_eq!(output.cache_hit, None);
    }

    #[tokio::test]
    async fn forbidden_surfaces_error_titles() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1.0/removebg")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errors":[{"title":"API Key invalid"}]}"#)
            .create_async()
            .await;

        let failure = provider_for(&server)
            .remove_background(&upload())
            .await
            .unwrap_err();

        assert_eq!(failure.reason, FailureReason::AuthFailure);
        assert_eq!(failure.status, Some(403));
        assert_eq!(failure.message, "API Key invalid");
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        let cases = [
            (400, FailureReason::InvalidInput),
            (402, FailureReason::QuotaExceeded),
            (429, FailureReason::RateLimited),
            (500, FailureReason::ProviderError),
            (503, FailureReason::UpstreamUnavailable),
            (504, FailureReason::Timeout),
            (418, FailureReason::Unknown),
        ];

        for (status, expected) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/v1.0/removebg")
                .with_status(status)
                .with_body("nope")
                .create_async()
                .await;

            let failure = provider_for(&server)
                .remove_background(&upload())
                .await
                .unwrap_err();
            assert_eq!(failure.reason, expected, "status {status}");
            assert_eq!(failure.message, "nope");
        }
    }

    #[test]
    fn error_details_joins_titles_and_details() {
        let body = r#"{"errors":[{"title":"Invalid image","detail":"too small"},{"title":"Other"}]}"#;
        assert_eq!(error_details(body), "Invalid image: too small; Other");
        assert_eq!(error_details("plain text"), "plain text");
        assert_eq!(error_details(r#"{"errors":[]}"#), r#"{"errors":[]}"#);
    }

    fn provider_at(base_url: String, timeout: Duration) -> RemoveBgProvider {
        let settings = ProviderSettings::new(ProviderKind::RemoveBg, "rbg_test_key", base_url)
            .with_timeout(timeout);
        RemoveBgProvider::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn silent_upstream_is_a_timeout() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let provider = provider_at(
            format!("http://{}/v1.0/removebg", addr),
            Duration::from_secs(1),
        );
        let started = std::time::Instant::now();
        let failure = provider.remove_background(&upload()).await.unwrap_err();

        assert_eq!(failure.reason, FailureReason::Timeout);
        assert_eq!(failure.status, None);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = provider_at(
            format!("http://{}/v1.0/removebg", addr),
            Duration::from_secs(5),
        );
        let failure = provider.remove_background(&upload()).await.unwrap_err();

        assert_eq!(failure.reason, FailureReason::UpstreamUnavailable);
    }
}
