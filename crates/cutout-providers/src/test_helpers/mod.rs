//! Stub providers for exercising the relay without network access
//!
//! Every stub counts its calls so tests can assert that rejected uploads never reach
//! the provider.

use async_trait::async_trait;
use cutout_core::{FailureReason, ProviderFailure, ProviderOutput, ProviderResult, UploadedFile};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::provider::BackgroundRemover;

#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Returns the uploaded bytes unchanged, labelled as PNG.
#[derive(Debug, Clone, Default)]
pub struct EchoProvider {
    pub calls: CallCounter,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackgroundRemover for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult {
        self.calls.hit();
        Ok(ProviderOutput::new(file.data.clone(), "image/png"))
    }
}

/// Always fails with the configured reason.
#[derive(Debug, Clone)]
pub struct FailingProvider {
    pub reason: FailureReason,
    pub status: Option<u16>,
    pub message: String,
    pub calls: CallCounter,
}

impl FailingProvider {
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            status: None,
            message: format!("stub failure: {}", reason),
            calls: CallCounter::default(),
        }
    }

    /// Fail the way an upstream answering with `status` would.
    pub fn with_status(status: u16) -> Self {
        Self {
            reason: FailureReason::from_status(status),
            status: Some(status),
            message: format!("upstream answered {}", status),
            calls: CallCounter::default(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn remove_background(&self, _file: &UploadedFile) -> ProviderResult {
        self.calls.hit();
        Err(ProviderFailure {
            reason: self.reason,
            status: self.status,
            message: self.message.clone(),
        })
    }
}

/// Echoes after a delay; used to drive relay timeouts.
#[derive(Debug, Clone)]
pub struct SlowProvider {
    pub delay: Duration,
    pub calls: CallCounter,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: CallCounter::default(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn remove_background(&self, file: &UploadedFile) -> ProviderResult {
        self.calls.hit();
        tokio::time::sleep(self.delay).await;
        Ok(ProviderOutput::new(file.data.clone(), "image/png"))
    }
}
