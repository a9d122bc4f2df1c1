//! Upload domain module.
//!
//! Per-file transfer state, intake validation and the pure transfer state machine
//! used by the upload workspace.

pub mod file;
pub mod state_machine;
pub mod validation;

pub use file::{PreviewHandle, SelectedFile, TransferState, UploadStatus, UploadableFile};
pub use state_machine::{UploadAction, UploadEvent, UploadStateMachine, UPLOAD_FAILURE_MESSAGE};
pub use validation::{
    FileValidationError, FileValidator, RejectionReason, ACCEPTED_MIME_TYPES, MAX_FILE_SIZE_BYTES,
};
