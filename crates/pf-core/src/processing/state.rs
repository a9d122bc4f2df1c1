use serde::{Deserialize, Serialize};

use crate::processing::ProcessingStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Processing,
    Paused,
    Error,
    Completed,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Paused => "paused",
            ProcessingStatus::Error => "error",
            ProcessingStatus::Completed => "completed",
        }
    }
}

/// Snapshot of a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub current_stage: ProcessingStage,
    /// Percentage in `0..=100`.
    pub progress: f64,
    /// Seconds; never increases while the run is going.
    pub estimated_time_remaining: u32,
    pub status: ProcessingStatus,
    pub is_paused: bool,
}

impl ProcessingState {
    /// State at dashboard mount.
    pub fn seeded(seed_progress: f64, initial_eta_secs: u32) -> Self {
        Self {
            current_stage: ProcessingStage::Analyzing,
            progress: seed_progress.clamp(0.0, 100.0),
            estimated_time_remaining: initial_eta_secs,
            status: ProcessingStatus::Processing,
            is_paused: false,
        }
    }

    /// State after a retry from the beginning.
    pub fn restarted(initial_eta_secs: u32) -> Self {
        Self::seeded(0.0, initial_eta_secs)
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessingStatus::Processing && !self.is_paused
    }
}
