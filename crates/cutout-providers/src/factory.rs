//! Provider selection from configuration

use anyhow::Context;
use cutout_core::config::{ProviderKind, ProviderSettings};
use std::sync::Arc;

use crate::custom::CustomProvider;
use crate::provider::BackgroundRemover;
use crate::remove_bg::RemoveBgProvider;
use crate::replicate::ReplicateProvider;

/// Build the adapter selected by `settings.kind`.
pub fn build_provider(settings: &ProviderSettings) -> anyhow::Result<Arc<dyn BackgroundRemover>> {
    settings
        .validate()
        .with_context(|| format!("Invalid configuration for provider {}", settings.kind))?;

    let provider: Arc<dyn BackgroundRemover> = match settings.kind {
        ProviderKind::Replicate => Arc::new(ReplicateProvider::new(settings)?),
        ProviderKind::RemoveBg => Arc::new(RemoveBgProvider::new(settings)?),
        ProviderKind::Custom => Arc::new(CustomProvider::new(settings)?),
    };

    tracing::info!(
        provider = provider.name(),
        base_url = %settings.base_url,
        timeout_secs = settings.timeout.as_secs(),
        "Background removal provider initialized"
    );

    Ok(provider)
}
