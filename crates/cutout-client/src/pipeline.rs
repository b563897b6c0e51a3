//! Client-side background-removal pipeline
//!
//! `Idle → Previewing → Processing → Done | Failed → Idle`. Selection is checked
//! locally before any network call. Each selection gets a `Ticket`; a result that
//! arrives for an older ticket (after a reset or a new selection) is dropped.

use bytes::Bytes;
use cutout_core::validation::DEFAULT_MAX_FILE_SIZE;
use std::path::Path;

use crate::{ClientError, RelayClient, SelectedFile};

#[derive(Debug, Clone)]
pub enum ClientState {
    Idle,
    /// Local preview of the selected image; no request sent yet.
    Previewing { original: SelectedFile },
    Processing { original: SelectedFile },
    Done { original: SelectedFile, processed: Bytes },
    /// Terminal failure for the last request, with the message to show.
    Failed { message: String },
}

impl ClientState {
    pub fn name(&self) -> &'static str {
        match self {
            ClientState::Idle => "idle",
            ClientState::Previewing { .. } => "previewing",
            ClientState::Processing { .. } => "processing",
            ClientState::Done { .. } => "done",
            ClientState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalRejection {
    #[error("Please upload an image file")]
    NotAnImage,
    #[error("File size must be less than 10MB")]
    TooLarge,
    #[error("A background removal is already in progress")]
    Busy,
}

/// Identifies one selection; stale tickets are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct ClientPipeline {
    state: ClientState,
    generation: u64,
}

impl Default for ClientPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientPipeline {
    pub fn new() -> Self {
        Self {
            state: ClientState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// Accept a file for processing and show it as a preview.
    pub fn select(&mut self, file: SelectedFile) -> Result<Ticket, LocalRejection> {
        if matches!(self.state, ClientState::Processing { .. }) {
            return Err(LocalRejection::Busy);
        }
        if !file.content_type.starts_with("image/") {
            return Err(LocalRejection::NotAnImage);
        }
        if file.size() > DEFAULT_MAX_FILE_SIZE {
            return Err(LocalRejection::TooLarge);
        }

        self.generation += 1;
        self.state = ClientState::Previewing { original: file };
        Ok(Ticket(self.generation))
    }

    /// Move the previewed file into processing. Returns the file to send, or `None`
    /// when `ticket` is stale or nothing is being previewed.
    pub fn begin(&mut self, ticket: Ticket) -> Option<SelectedFile> {
        if !self.is_current(ticket) {
            return None;
        }
        match std::mem::replace(&mut self.state, ClientState::Idle) {
            ClientState::Previewing { original } => {
                self.state = ClientState::Processing {
                    original: original.clone(),
                };
                Some(original)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Apply the outcome of the request started for `ticket`.
    ///
    /// Returns `false` and leaves the state untouched when the ticket is stale.
    pub fn finish(&mut self, ticket: Ticket, result: Result<Bytes, ClientError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.0,
                current = self.generation,
                "Ignoring result for an abandoned request"
            );
            return false;
        }

        let original = match std::mem::replace(&mut self.state, ClientState::Idle) {
            ClientState::Processing { original } => original,
            other => {
                self.state = other;
                return false;
            }
        };

        self.state = match result {
            Ok(processed) => ClientState::Done {
                original,
                processed,
            },
            Err(err) => ClientState::Failed {
                message: err.user_message(),
            },
        };
        true
    }

    /// Discard all images and return to `Idle`.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = ClientState::Idle;
    }

    /// Leave `Failed` for `Idle` so a fresh upload can start.
    pub fn retry(&mut self) -> bool {
        if matches!(self.state, ClientState::Failed { .. }) {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Write the processed image to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ClientError> {
        match &self.state {
            ClientState::Done { processed, .. } => {
                std::fs::write(path, processed).map_err(|source| ClientError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
            _ => Err(ClientError::NothingToSave),
        }
    }

    /// Select `file`, send it, and record the outcome.
    pub async fn process(
        &mut self,
        client: &RelayClient,
        file: SelectedFile,
    ) -> Result<&ClientState, LocalRejection> {
        let ticket = self.select(file)?;
        if let Some(upload) = self.begin(ticket) {
            let result = client.remove_background(&upload).await;
            self.finish(ticket, result);
        }
        Ok(&self.state)
    }
}

/// `background-removed-<unix millis>.png`
pub fn suggested_save_name() -> String {
    format!(
        "background-removed-{}.png",
        chrono::Utc::now().timestamp_millis()
    )
}
