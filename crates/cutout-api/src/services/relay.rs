//! Relay service
//!
//! Runs one upload through validation and exactly one provider call. The provider call
//! is bounded by a timeout and happens inside the handler's own future, so a client
//! disconnect (which drops that future) also drops the pending provider request.

use cutout_core::{AppError, ProviderFailure, RelayImage, UploadValidator, UploadedFile};
use cutout_providers::BackgroundRemover;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Span;

/// Per-request lifecycle, recorded on the tracing span as `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Received,
    Validating,
    InvokingProvider,
    Completed,
    Failed,
}

impl RelayStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayStage::Received => "received",
            RelayStage::Validating => "validating",
            RelayStage::InvokingProvider => "invoking-provider",
            RelayStage::Completed => "completed",
            RelayStage::Failed => "failed",
        }
    }
}

fn enter(stage: RelayStage) {
    Span::current().record("stage", stage.as_str());
    tracing::debug!(stage = stage.as_str(), "Relay stage");
}

#[derive(Clone)]
pub struct RelayService {
    validator: UploadValidator,
    provider: Arc<dyn BackgroundRemover>,
    timeout: Duration,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("validator", &self.validator)
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RelayService {
    pub fn new(
        validator: UploadValidator,
        provider: Arc<dyn BackgroundRemover>,
        timeout: Duration,
    ) -> Self {
        Self {
            validator,
            provider,
            timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Handle one upload; `None` means the request carried no file field.
    #[tracing::instrument(
        name = "relay",
        skip_all,
        fields(
            provider = %self.provider.name(),
            stage = tracing::field::Empty,
            filename = tracing::field::Empty,
            size = tracing::field::Empty,
            mime = tracing::field::Empty,
        )
    )]
    pub async fn handle(&self, upload: Option<UploadedFile>) -> Result<RelayImage, AppError> {
        enter(RelayStage::Received);

        let result = self.run(upload).await;

        match &result {
            Ok(_) => enter(RelayStage::Completed),
            Err(err) => {
                enter(RelayStage::Failed);
                tracing::info!(error = %err, "Relay request failed");
            }
        }

        result
    }

    async fn run(&self, upload: Option<UploadedFile>) -> Result<RelayImage, AppError> {
        let file = upload.ok_or(AppError::NoFileUploaded)?;

        let span = Span::current();
        span.record("filename", file.filename.as_str());
        span.record("size", file.size());
        span.record("mime", file.content_type.as_str());

        enter(RelayStage::Validating);
        self.validator.validate(&file)?;

        enter(RelayStage::InvokingProvider);
        let started = Instant::now();
        let output = tokio::time::timeout(self.timeout, self.provider.remove_background(&file))
            .await
            .map_err(|_| {
                ProviderFailure::timeout(format!(
                    "Provider did not answer within {}s",
                    self.timeout.as_secs_f64()
                ))
            })??;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_bytes = output.data.len(),
            cache_hit = ?output.cache_hit,
            "Background removed"
        );

        Ok(RelayImage::png(output.data))
    }
}
