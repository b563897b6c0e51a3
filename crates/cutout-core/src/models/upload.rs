use bytes::Bytes;

/// An image received at request ingress.
///
/// Lives for the duration of one request and is never written to disk.
#[derive(Clone)]
pub struct UploadedFile {
    pub data: Bytes,
    /// Declared MIME type, parameters stripped and lowercased.
    pub content_type: String,
    pub filename: String,
}

impl UploadedFile {
    pub fn new(
        data: impl Into<Bytes>,
        content_type: impl AsRef<str>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            content_type: normalize_mime_type(content_type.as_ref()),
            filename: filename.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// `data:<mime>;base64,<payload>` encoding used by inference APIs that accept inline input.
    pub fn to_data_uri(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Normalize a MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}
