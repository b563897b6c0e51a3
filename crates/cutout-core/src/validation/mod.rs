//! Upload validation
//!
//! Enforces the upload constraints (MIME allow-list, size ceiling) before any
//! network call is made. Validation looks at metadata only and has no side effects.

use crate::models::{normalize_mime_type, UploadedFile};

/// Default size ceiling: 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Default MIME allow-list. `image/jpg` is a common non-standard alias for JPEG.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Unsupported content type: {content_type}")]
    UnsupportedType { content_type: String },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },
}

impl Rejection {
    /// Machine-readable reason string.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::UnsupportedType { .. } => "unsupported-type",
            Rejection::TooLarge { .. } => "too-large",
        }
    }
}

/// Upload validator
///
/// Size is checked before type so that oversized files are reported as
/// `too-large` regardless of their declared MIME type.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .iter()
                .map(|ct| normalize_mime_type(ct))
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), Rejection> {
        if size > self.max_file_size {
            return Err(Rejection::TooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), Rejection> {
        let normalized = normalize_mime_type(content_type);

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(Rejection::UnsupportedType {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    pub fn validate(&self, file: &UploadedFile) -> Result<(), Rejection> {
        self.validate_file_size(file.size())?;
        self.validate_content_type(&file.content_type)
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_FILE_SIZE,
            DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}
