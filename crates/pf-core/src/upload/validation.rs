//! Intake validation for selected files.
//!
//! Rejected files are reported inline and never enter the upload pipeline.

use serde::{Deserialize, Serialize};

use crate::processing::FailureKind;
use crate::upload::SelectedFile;

/// MIME types the workspace accepts.
pub const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/svg+xml"];

/// Maximum accepted file size (10 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("Unsupported file format. Only JPG, PNG and SVG files can be uploaded.")]
    UnsupportedFormat { mime_type: String },
    #[error("File is too large. Only files up to {} MB can be uploaded.", max_bytes / (1024 * 1024))]
    TooLarge { size: u64, max_bytes: u64 },
}

impl RejectionReason {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            RejectionReason::UnsupportedFormat { .. } => FailureKind::FileFormat,
            RejectionReason::TooLarge { .. } => FailureKind::FileSize,
        }
    }
}

/// A file that failed intake validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{file_name}: {reason}")]
pub struct FileValidationError {
    pub file_name: String,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Copy)]
pub struct FileValidator {
    max_size_bytes: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_FILE_SIZE_BYTES,
        }
    }
}

impl FileValidator {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    /// Format is checked before size.
    pub fn validate(&self, file: &SelectedFile) -> Result<(), RejectionReason> {
        if !ACCEPTED_MIME_TYPES.contains(&file.mime_type.as_str()) {
            return Err(RejectionReason::UnsupportedFormat {
                mime_type: file.mime_type.clone(),
            });
        }
        if file.size > self.max_size_bytes {
            return Err(RejectionReason::TooLarge {
                size: file.size,
                max_bytes: self.max_size_bytes,
            });
        }
        Ok(())
    }

    /// Splits a selection into accepted files and rejections, preserving order.
    pub fn partition(
        &self,
        files: Vec<SelectedFile>,
    ) -> (Vec<SelectedFile>, Vec<FileValidationError>) {
        let mut accepted = Vec::with_capacity(files.len());
        let mut rejected = Vec::new();
        for file in files {
            match self.validate(&file) {
                Ok(()) => accepted.push(file),
                Err(reason) => rejected.push(FileValidationError {
                    file_name: file.name,
                    reason,
                }),
            }
        }
        (accepted, rejected)
    }
}
