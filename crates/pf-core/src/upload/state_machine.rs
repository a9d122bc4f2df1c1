//! Upload transfer state machine.
//!
//! Pure transition function for one file's simulated transfer. Randomness is
//! drawn by the caller and passed in through events.

use serde::{Deserialize, Serialize};

use crate::upload::TransferState;

/// Message attached to a simulated transfer failure.
pub const UPLOAD_FAILURE_MESSAGE: &str = "Upload failed due to a network error.";

/// Events that drive a single transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UploadEvent {
    /// One transfer tick with a pre-drawn progress increment.
    Tick { increment: f64 },
    /// Terminal decision, requested through [`UploadAction::ResolveOutcome`].
    Resolve { failed: bool },
    /// User asked to retry a failed transfer.
    Retry,
}

/// Side-effects produced by transfer transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadAction {
    /// Progress reached 100; the caller must draw the outcome and send `Resolve`.
    ResolveOutcome,
    /// The transfer reached a terminal state.
    TransferFinished { succeeded: bool },
    /// The file must be queued for another transfer.
    Enqueue,
}

pub struct UploadStateMachine;

impl UploadStateMachine {
    pub fn transition(state: TransferState, event: UploadEvent) -> (TransferState, Vec<UploadAction>) {
        match (state, event) {
            (TransferState::Pending, UploadEvent::Tick { increment }) => advance(0.0, increment),
            (TransferState::Uploading { progress }, UploadEvent::Tick { increment })
                if progress < 100.0 =>
            {
                advance(progress, increment)
            }
            (TransferState::Uploading { progress }, UploadEvent::Resolve { failed })
                if progress >= 100.0 =>
            {
                if failed {
                    (
                        TransferState::Failed {
                            message: UPLOAD_FAILURE_MESSAGE.to_string(),
                        },
                        vec![UploadAction::TransferFinished { succeeded: false }],
                    )
                } else {
                    (
                        TransferState::Uploaded,
                        vec![UploadAction::TransferFinished { succeeded: true }],
                    )
                }
            }
            (TransferState::Failed { .. }, UploadEvent::Retry) => {
                (TransferState::Pending, vec![UploadAction::Enqueue])
            }
            (state, ignored) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = ?state.status(), event = ?ignored, "ignored upload event");
                #[cfg(not(feature = "tracing"))]
                let _ = ignored;
                (state, Vec::new())
            }
        }
    }
}

fn advance(progress: f64, increment: f64) -> (TransferState, Vec<UploadAction>) {
    // Non-finite or negative draws must not move progress backwards.
    let increment = if increment.is_finite() { increment.max(0.0) } else { 0.0 };
    let next = progress + increment;
    if next >= 100.0 {
        (
            TransferState::Uploading { progress: 100.0 },
            vec![UploadAction::ResolveOutcome],
        )
    } else {
        (TransferState::Uploading { progress: next }, Vec::new())
    }
}
