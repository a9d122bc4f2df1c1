//! Business logic use cases
//!
//! upload workspace -> processing orchestrator -> download center
//!
//! The auth callback reconciler and the session use cases sit beside that
//! journey and only talk to the session holder.

pub mod auth;
pub mod download;
pub mod processing;
pub mod profile;
pub mod upload;

pub use auth::{AuthSession, AuthSessionError, ReconcileAuthCallback};
pub use download::{DownloadCenter, DownloadError, ShareText};
pub use processing::{ProcessingError, ProcessingOrchestrator, ProcessingSnapshot, RunSource};
pub use profile::{GetProfile, UpdateProfile};
pub use upload::{SubmitReport, UploadError, UploadStats, UploadWorkspace};
