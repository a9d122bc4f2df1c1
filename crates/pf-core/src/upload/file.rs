use serde::{Deserialize, Serialize};

use crate::ids::FileId;

/// A file as handed over by drag-and-drop or the native file picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    pub mime_type: String,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Reference to a local preview resource (an object URL in a browser).
///
/// Acquired when the file is registered and released exactly once, on removal
/// or workspace teardown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flat lifecycle status, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Uploaded,
    Error,
}

/// Transfer state of a single file.
///
/// Each variant only carries the data that is meaningful in it, so an uploaded
/// file cannot hold an error and a failed file always holds one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferState {
    Pending,
    Uploading { progress: f64 },
    Uploaded,
    Failed { message: String },
}

impl TransferState {
    pub fn status(&self) -> UploadStatus {
        match self {
            TransferState::Pending => UploadStatus::Pending,
            TransferState::Uploading { .. } => UploadStatus::Uploading,
            TransferState::Uploaded => UploadStatus::Uploaded,
            TransferState::Failed { .. } => UploadStatus::Error,
        }
    }

    /// Progress percentage in `0..=100`.
    ///
    /// A failed transfer reports 100: failures are only decided once the
    /// simulated transfer has run to completion.
    pub fn progress(&self) -> f64 {
        match self {
            TransferState::Pending => 0.0,
            TransferState::Uploading { progress } => *progress,
            TransferState::Uploaded | TransferState::Failed { .. } => 100.0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TransferState::Failed { message } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Uploaded | TransferState::Failed { .. })
    }
}

/// A validated file managed by the upload workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadableFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub preview: Option<PreviewHandle>,
    pub state: TransferState,
}

impl UploadableFile {
    pub fn register(id: FileId, file: &SelectedFile, preview: Option<PreviewHandle>) -> Self {
        Self {
            id,
            name: file.name.clone(),
            size: file.size,
            mime_type: file.mime_type.clone(),
            preview,
            state: TransferState::Pending,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.state.status()
    }

    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }
}
