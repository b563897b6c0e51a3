//! Background-removal provider adapters
//!
//! Each adapter translates an [`UploadedFile`](cutout_core::UploadedFile) into one
//! external service's protocol and maps every failure into the shared
//! [`FailureReason`](cutout_core::FailureReason) taxonomy.

mod custom;
mod factory;
mod provider;
mod remove_bg;
mod replicate;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use custom::CustomProvider;
pub use factory::build_provider;
pub use provider::BackgroundRemover;
pub use remove_bg::RemoveBgProvider;
pub use replicate::ReplicateProvider;
