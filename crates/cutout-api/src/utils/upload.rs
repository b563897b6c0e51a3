//! Multipart upload extraction

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use cutout_core::{AppError, UploadedFile};

use crate::constants::FILE_FIELD;

fn multipart_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("{}: {}", context, err.body_text()))
    }
}

/// Read the single image field from a multipart body.
///
/// Returns `Ok(None)` when the body has no `file` part carrying a filename. Other
/// fields, and plain text values posted under `file`, are skipped. A missing part
/// content type is treated as `application/octet-stream`.
pub async fn extract_upload(mut multipart: Multipart) -> Result<Option<UploadedFile>, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Form text fields and empty browser file inputs carry no filename
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        if upload.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Multiple file fields are not allowed; send exactly one field named '{}'",
                FILE_FIELD
            )));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file data", e))?;

        upload = Some(UploadedFile::new(data, content_type, filename));
    }

    Ok(upload)
}
