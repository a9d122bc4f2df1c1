mod orchestrator;

pub use orchestrator::{ProcessingError, ProcessingOrchestrator, ProcessingSnapshot, RunSource};
