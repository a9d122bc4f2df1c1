//! PrintForge application layer
//!
//! Use cases and orchestrators that drive the upload, processing, auth and
//! download workflows through the ports defined in `pf-core`.

pub mod usecases;

pub use usecases::{
    AuthSession, DownloadCenter, GetProfile, ProcessingOrchestrator, ReconcileAuthCallback,
    UpdateProfile, UploadWorkspace,
};
