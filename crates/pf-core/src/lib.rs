//! # pf-core
//!
//! Core domain models and workflow state machines for PrintForge.
//!
//! This crate contains pure business logic without any infrastructure dependencies.
//! Timing, randomness and the hosted session backend are reached only through
//! the traits in [`ports`].

// Public module exports
pub mod auth;
pub mod config;
pub mod download;
pub mod ids;
pub mod navigation;
pub mod ports;
pub mod processing;
pub mod upload;

// Re-export commonly used types at the crate root
pub use config::AppConfig;
pub use ids::{FileId, ModelId, UserId};
pub use navigation::{Navigation, Route, WorkflowStep};
pub use processing::{
    FailureKind, ProcessingFault, ProcessingStage, ProcessingState, ProcessingStatus,
};
pub use upload::{SelectedFile, TransferState, UploadStatus, UploadableFile};
