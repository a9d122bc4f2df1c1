//! Processing state machine.
//!
//! Pure transition function for a processing run. Progress increments and
//! fault draws are made by the caller and passed in through events, so every
//! transition is deterministic.

use serde::{Deserialize, Serialize};

use crate::processing::{FailureKind, ProcessingFault, ProcessingState, ProcessingStatus};

/// Events that drive a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessingEvent {
    /// Dashboard mounted; start timers for the seeded run.
    Start,
    /// Interval tick with a pre-drawn progress increment.
    Tick { increment: f64 },
    Pause,
    Resume,
    /// The fault check fired and the draw selected a failure.
    FaultInjected { kind: FailureKind, raised_at_ms: i64 },
    RetryFromStart,
}

/// Side-effects produced by state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingAction {
    StartTicking,
    StopTicking,
    /// Arm the one-shot fault check for the current run.
    ArmFaultCheck,
    DisarmFaultCheck,
    /// Hand off to the download stage after the configured delay.
    ScheduleHandoff { processing_time_secs: u32 },
    CancelHandoff,
    RaiseFault(ProcessingFault),
}

/// Fixed parameters of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTuning {
    pub eta_step_secs: u32,
    pub initial_eta_secs: u32,
}

impl Default for ProcessingTuning {
    fn default() -> Self {
        Self {
            eta_step_secs: 5,
            initial_eta_secs: 180,
        }
    }
}

/// Pure processing state machine.
///
/// Holds tuning only; the run state is passed in and returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingStateMachine {
    tuning: ProcessingTuning,
}

impl ProcessingStateMachine {
    pub fn new(tuning: ProcessingTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> ProcessingTuning {
        self.tuning
    }

    pub fn transition(
        &self,
        state: ProcessingState,
        event: ProcessingEvent,
    ) -> (ProcessingState, Vec<ProcessingAction>) {
        match event {
            ProcessingEvent::Start if state.is_running() => (
                state,
                vec![ProcessingAction::StartTicking, ProcessingAction::ArmFaultCheck],
            ),
            ProcessingEvent::Tick { increment } if state.is_running() => self.tick(state, increment),
            ProcessingEvent::Pause if state.status == ProcessingStatus::Processing => (
                ProcessingState {
                    status: ProcessingStatus::Paused,
                    is_paused: true,
                    ..state
                },
                vec![ProcessingAction::StopTicking],
            ),
            ProcessingEvent::Resume if state.status == ProcessingStatus::Paused => (
                ProcessingState {
                    status: ProcessingStatus::Processing,
                    is_paused: false,
                    ..state
                },
                vec![ProcessingAction::StartTicking],
            ),
            ProcessingEvent::FaultInjected { kind, raised_at_ms }
                if state.status == ProcessingStatus::Processing =>
            {
                let fault = ProcessingFault::new(kind, state.current_stage, raised_at_ms);
                (
                    ProcessingState {
                        status: ProcessingStatus::Error,
                        ..state
                    },
                    vec![
                        ProcessingAction::StopTicking,
                        ProcessingAction::RaiseFault(fault),
                    ],
                )
            }
            ProcessingEvent::RetryFromStart => (
                ProcessingState::restarted(self.tuning.initial_eta_secs),
                vec![
                    ProcessingAction::CancelHandoff,
                    ProcessingAction::StartTicking,
                    ProcessingAction::ArmFaultCheck,
                ],
            ),
            ignored => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = state.status.as_str(), event = ?ignored, "ignored processing event");
                #[cfg(not(feature = "tracing"))]
                let _ = ignored;
                (state, Vec::new())
            }
        }
    }

    fn tick(&self, state: ProcessingState, increment: f64) -> (ProcessingState, Vec<ProcessingAction>) {
        let increment = if increment.is_finite() { increment.max(0.0) } else { 0.0 };
        let progress = state.progress + increment;
        let current_stage = state.current_stage.advance_for(progress);
        let estimated_time_remaining = state
            .estimated_time_remaining
            .saturating_sub(self.tuning.eta_step_secs);

        if progress >= 100.0 {
            let processing_time_secs = self
                .tuning
                .initial_eta_secs
                .saturating_sub(state.estimated_time_remaining);
            return (
                ProcessingState {
                    current_stage,
                    progress: 100.0,
                    estimated_time_remaining: 0,
                    status: ProcessingStatus::Completed,
                    is_paused: false,
                },
                vec![
                    ProcessingAction::StopTicking,
                    ProcessingAction::DisarmFaultCheck,
                    ProcessingAction::ScheduleHandoff {
                        processing_time_secs,
                    },
                ],
            );
        }

        (
            ProcessingState {
                current_stage,
                progress,
                estimated_time_remaining,
                ..state
            },
            Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ProcessingStage;

    fn machine() -> ProcessingStateMachine {
        ProcessingStateMachine::new(ProcessingTuning::default())
    }

    fn seeded() -> ProcessingState {
        ProcessingState::seeded(15.0, 180)
    }

    #[test]
    fn start_arms_ticking_and_fault_check() {
        let (next, actions) = machine().transition(seeded(), ProcessingEvent::Start);
        assert_eq!(next, seeded());
        assert_eq!(
            actions,
            vec![ProcessingAction::StartTicking, ProcessingAction::ArmFaultCheck]
        );
    }

    #[test]
    fn tick_advances_progress_and_counts_down_eta() {
        let (next, actions) = machine().transition(seeded(), ProcessingEvent::Tick { increment: 2.0 });
        assert_eq!(next.progress, 17.0);
        assert_eq!(next.estimated_time_remaining, 175);
        assert_eq!(next.current_stage, ProcessingStage::Analyzing);
        assert!(actions.is_empty());
    }

    #[test]
    fn eta_floors_at_zero() {
        let state = ProcessingState {
            estimated_time_remaining: 3,
            ..seeded()
        };
        let (next, _) = machine().transition(state, ProcessingEvent::Tick { increment: 1.0 });
        assert_eq!(next.estimated_time_remaining, 0);
    }

    #[test]
    fn crossing_threshold_moves_to_next_stage() {
        let state = ProcessingState {
            progress: 24.0,
            ..seeded()
        };
        let (next, _) = machine().transition(state, ProcessingEvent::Tick { increment: 1.5 });
        assert_eq!(next.current_stage, ProcessingStage::Generating);
    }

    #[test]
    fn reaching_hundred_completes_and_schedules_single_handoff() {
        let state = ProcessingState {
            current_stage: ProcessingStage::Finalizing,
            progress: 99.0,
            estimated_time_remaining: 20,
            ..seeded()
        };
        let (next, actions) = machine().transition(state, ProcessingEvent::Tick { increment: 2.5 });
        assert_eq!(next.status, ProcessingStatus::Completed);
        assert_eq!(next.progress, 100.0);
        assert_eq!(next.estimated_time_remaining, 0);
        assert_eq!(
            actions,
            vec![
                ProcessingAction::StopTicking,
                ProcessingAction::DisarmFaultCheck,
                ProcessingAction::ScheduleHandoff {
                    processing_time_secs: 160
                },
            ]
        );

        let (after, actions) = machine().transition(next.clone(), ProcessingEvent::Tick { increment: 2.0 });
        assert_eq!(after, next);
        assert!(actions.is_empty());
    }

    #[test]
    fn pause_freezes_ticks_until_resume() {
        let (paused, actions) = machine().transition(seeded(), ProcessingEvent::Pause);
        assert!(paused.is_paused);
        assert_eq!(paused.status, ProcessingStatus::Paused);
        assert_eq!(actions, vec![ProcessingAction::StopTicking]);

        let (still, actions) = machine().transition(paused.clone(), ProcessingEvent::Tick { increment: 2.9 });
        assert_eq!(still, paused);
        assert!(actions.is_empty());

        let (resumed, actions) = machine().transition(still, ProcessingEvent::Resume);
        assert!(!resumed.is_paused);
        assert_eq!(resumed.status, ProcessingStatus::Processing);
        assert_eq!(resumed.progress, 15.0);
        assert_eq!(actions, vec![ProcessingAction::StartTicking]);
    }

    #[test]
    fn resume_is_ignored_unless_paused() {
        let (next, actions) = machine().transition(seeded(), ProcessingEvent::Resume);
        assert_eq!(next, seeded());
        assert!(actions.is_empty());
    }

    #[test]
    fn fault_only_applies_while_processing() {
        let (failed, actions) = machine().transition(
            seeded(),
            ProcessingEvent::FaultInjected {
                kind: FailureKind::ServerError,
                raised_at_ms: 42,
            },
        );
        assert_eq!(failed.status, ProcessingStatus::Error);
        match &actions[..] {
            [ProcessingAction::StopTicking, ProcessingAction::RaiseFault(fault)] => {
                assert_eq!(fault.kind, FailureKind::ServerError);
                assert_eq!(fault.stage, ProcessingStage::Analyzing);
                assert_eq!(fault.code, "ERR_SERVER_ERROR_42");
            }
            other => panic!("unexpected actions: {other:?}"),
        }

        let (paused, _) = machine().transition(seeded(), ProcessingEvent::Pause);
        let (next, actions) = machine().transition(
            paused.clone(),
            ProcessingEvent::FaultInjected {
                kind: FailureKind::ServerError,
                raised_at_ms: 42,
            },
        );
        assert_eq!(next, paused);
        assert!(actions.is_empty());
    }

    #[test]
    fn retry_resets_to_fresh_run() {
        let failed = ProcessingState {
            current_stage: ProcessingStage::Optimizing,
            progress: 70.0,
            estimated_time_remaining: 40,
            status: ProcessingStatus::Error,
            is_paused: false,
        };
        let (next, actions) = machine().transition(failed, ProcessingEvent::RetryFromStart);
        assert_eq!(next, ProcessingState::restarted(180));
        assert_eq!(next.progress, 0.0);
        assert_eq!(
            actions,
            vec![
                ProcessingAction::CancelHandoff,
                ProcessingAction::StartTicking,
                ProcessingAction::ArmFaultCheck,
            ]
        );
    }

    #[test]
    fn stage_index_never_decreases_over_a_run() {
        let machine = machine();
        let mut state = seeded();
        let mut last_index = state.current_stage.index();
        while state.status == ProcessingStatus::Processing {
            let before = state.progress;
            let (next, _) = machine.transition(state, ProcessingEvent::Tick { increment: 2.7 });
            assert!(next.current_stage.index() >= last_index);
            if next.current_stage.index() > last_index {
                assert!(next.progress >= next.current_stage.entry_threshold());
            }
            assert!(next.progress >= before);
            last_index = next.current_stage.index();
            state = next;
        }
        assert_eq!(state.status, ProcessingStatus::Completed);
        assert_eq!(state.current_stage, ProcessingStage::Finalizing);
    }
}
