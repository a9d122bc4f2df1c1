mod workspace;

pub use workspace::{SubmitReport, UploadError, UploadStats, UploadWorkspace};
