//! Processing domain module.
//!
//! Stage model, run state, failure taxonomy and the pure state machine behind
//! the simulated AI-processing dashboard.

pub mod failure;
pub mod stage;
pub mod state;
pub mod state_machine;

pub use failure::{FailureDetails, FailureKind, ProcessingFault};
pub use stage::ProcessingStage;
pub use state::{ProcessingState, ProcessingStatus};
pub use state_machine::{
    ProcessingAction, ProcessingEvent, ProcessingStateMachine, ProcessingTuning,
};
