//! Cutout Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and upload
//! validation shared by the relay server, the provider adapters, and the client.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, ProviderKind, ProviderSettings, RateLimitConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    FailureReason, ProviderFailure, ProviderOutput, ProviderResult, RelayImage, UploadedFile,
};
pub use validation::{Rejection, UploadValidator};
