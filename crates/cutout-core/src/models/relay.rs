use bytes::Bytes;
use chrono::Utc;

/// Successful relay output: the processed image as it is sent to the caller.
#[derive(Clone)]
pub struct RelayImage {
    pub data: Bytes,
    pub content_type: &'static str,
    /// Suggested download name, `removed-bg-<unix millis>.png`.
    pub filename: String,
}

impl RelayImage {
    pub const CONTENT_TYPE: &'static str = "image/png";

    pub fn png(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: Self::CONTENT_TYPE,
            filename: format!("removed-bg-{}.png", Utc::now().timestamp_millis()),
        }
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

impl std::fmt::Debug for RelayImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayImage")
            .field("filename", &self.filename)
            .field("size", &self.data.len())
            .finish()
    }
}
