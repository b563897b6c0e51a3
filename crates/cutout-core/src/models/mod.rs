//! Domain models for the background-removal pipeline.

pub mod provider;
pub mod relay;
pub mod upload;

pub use provider::{FailureReason, ProviderFailure, ProviderOutput, ProviderResult};
pub use relay::RelayImage;
pub use upload::{normalize_mime_type, UploadedFile};
