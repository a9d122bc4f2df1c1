//! Processing orchestrator.
//!
//! This module coordinates the processing state machine and its timers: the
//! progress tick, the one-shot fault check and the hand-off to the download
//! center.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use pf_core::config::ProcessingConfig;
use pf_core::download::CompletedRun;
use pf_core::navigation::{Navigation, Route};
use pf_core::ports::{ClockPort, NavigatorPort, RandomSourcePort, SchedulerPort, TimerKey};
use pf_core::processing::{
    FailureKind, ProcessingAction, ProcessingEvent, ProcessingFault, ProcessingState,
    ProcessingStateMachine, ProcessingStatus, ProcessingTuning,
};

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("cannot {operation} while {status:?}")]
    InvalidTransition {
        operation: &'static str,
        status: ProcessingStatus,
    },
    #[error("processing run was cancelled")]
    Cancelled,
}

/// The uploaded file a run was started for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSource {
    pub file_name: String,
    pub file_size: u64,
}

impl Default for RunSource {
    fn default() -> Self {
        Self {
            file_name: "sketch_design_v2.png".to_string(),
            file_size: 2_457_600,
        }
    }
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingSnapshot {
    pub state: ProcessingState,
    pub fault: Option<ProcessingFault>,
    /// Progress of the generated-code preview, `0..=100`.
    pub code_generation_progress: f64,
    pub source: RunSource,
}

pub struct ProcessingOrchestrator {
    shared: Arc<Shared>,
}

struct Shared {
    config: ProcessingConfig,
    machine: ProcessingStateMachine,
    scheduler: Arc<dyn SchedulerPort>,
    random: Arc<dyn RandomSourcePort>,
    clock: Arc<dyn ClockPort>,
    navigator: Arc<dyn NavigatorPort>,
    scope: String,
    tick_key: TimerKey,
    fault_key: TimerKey,
    handoff_key: TimerKey,
    inner: Mutex<Inner>,
}

struct Inner {
    state: ProcessingState,
    fault: Option<ProcessingFault>,
    code_generation_progress: f64,
    source: RunSource,
    fault_checked: bool,
    handed_off: bool,
    disposed: bool,
}

impl ProcessingOrchestrator {
    pub fn new(
        config: ProcessingConfig,
        source: RunSource,
        scheduler: Arc<dyn SchedulerPort>,
        random: Arc<dyn RandomSourcePort>,
        clock: Arc<dyn ClockPort>,
        navigator: Arc<dyn NavigatorPort>,
    ) -> Self {
        let scope = format!("processing-{}", uuid::Uuid::new_v4());
        let machine = ProcessingStateMachine::new(ProcessingTuning {
            eta_step_secs: config.eta_step_secs,
            initial_eta_secs: config.initial_eta_secs,
        });
        let state = ProcessingState::seeded(config.seed_progress, config.initial_eta_secs);
        Self {
            shared: Arc::new(Shared {
                tick_key: TimerKey::new(&scope, "tick"),
                fault_key: TimerKey::new(&scope, "fault_check"),
                handoff_key: TimerKey::new(&scope, "handoff"),
                scope,
                config,
                machine,
                scheduler,
                random,
                clock,
                navigator,
                inner: Mutex::new(Inner {
                    state,
                    fault: None,
                    code_generation_progress: 0.0,
                    source,
                    fault_checked: false,
                    handed_off: false,
                    disposed: false,
                }),
            }),
        }
    }

    /// Starts the seeded run: progress ticking and the fault check.
    pub fn start(&self) -> Result<ProcessingSnapshot, ProcessingError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.disposed {
            return Err(ProcessingError::Cancelled);
        }
        Shared::dispatch(shared, &mut inner, ProcessingEvent::Start);
        Ok(Shared::snapshot(&inner))
    }

    /// One progress step. Normally driven by the scheduler.
    pub fn tick(&self) {
        Shared::tick(&self.shared);
    }

    pub fn pause(&self) -> Result<ProcessingSnapshot, ProcessingError> {
        self.guarded("pause", ProcessingStatus::Processing, ProcessingEvent::Pause)
    }

    pub fn resume(&self) -> Result<ProcessingSnapshot, ProcessingError> {
        self.guarded("resume", ProcessingStatus::Paused, ProcessingEvent::Resume)
    }

    /// Restarts from zero after a fault, or at any other point.
    pub fn retry_from_start(&self) -> Result<ProcessingSnapshot, ProcessingError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.disposed {
            return Err(ProcessingError::Cancelled);
        }
        inner.fault = None;
        inner.fault_checked = false;
        inner.handed_off = false;
        inner.code_generation_progress = 0.0;
        Shared::dispatch(shared, &mut inner, ProcessingEvent::RetryFromStart);
        Ok(Shared::snapshot(&inner))
    }

    /// Discards the run and returns the user to the upload workspace.
    pub fn cancel(&self) {
        if self.shared.dispose() {
            self.shared
                .navigator
                .navigate(Navigation::to(Route::UploadWorkspace));
        }
    }

    /// Runs the fault check now instead of waiting for its timer.
    pub fn check_for_fault(&self) {
        Shared::fault_check(&self.shared);
    }

    pub fn snapshot(&self) -> ProcessingSnapshot {
        Shared::snapshot(&self.shared.lock())
    }

    pub fn support_contact(&self) -> Option<String> {
        let inner = self.shared.lock();
        inner
            .fault
            .as_ref()
            .map(|fault| fault.support_contact(&self.shared.config.support_email))
    }

    fn guarded(
        &self,
        operation: &'static str,
        required: ProcessingStatus,
        event: ProcessingEvent,
    ) -> Result<ProcessingSnapshot, ProcessingError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.disposed {
            return Err(ProcessingError::Cancelled);
        }
        if inner.state.status != required {
            return Err(ProcessingError::InvalidTransition {
                operation,
                status: inner.state.status,
            });
        }
        Shared::dispatch(shared, &mut inner, event);
        Ok(Shared::snapshot(&inner))
    }
}

impl Drop for ProcessingOrchestrator {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(inner: &Inner) -> ProcessingSnapshot {
        ProcessingSnapshot {
            state: inner.state.clone(),
            fault: inner.fault.clone(),
            code_generation_progress: inner.code_generation_progress,
            source: inner.source.clone(),
        }
    }

    fn dispatch(this: &Arc<Shared>, inner: &mut Inner, event: ProcessingEvent) {
        let span = info_span!("usecase.processing_orchestrator.dispatch", event = ?event);
        let _enter = span.enter();

        let from = inner.state.status;
        let event_name = format!("{:?}", event);
        let (next, actions) = this.machine.transition(inner.state.clone(), event);
        if from != next.status {
            info!(from = ?from, to = ?next.status, event = %event_name, "processing state transition");
        }
        inner.state = next;
        Shared::execute_actions(this, inner, actions);
    }

    fn execute_actions(this: &Arc<Shared>, inner: &mut Inner, actions: Vec<ProcessingAction>) {
        for action in actions {
            debug!(?action, "processing executing action");
            match action {
                ProcessingAction::StartTicking => {
                    let weak = Arc::downgrade(this);
                    this.scheduler.schedule_repeating(
                        this.tick_key.clone(),
                        this.config.tick_interval(),
                        Box::new(move || {
                            if let Some(shared) = weak.upgrade() {
                                Shared::tick(&shared);
                            }
                        }),
                    );
                }
                ProcessingAction::StopTicking => this.scheduler.cancel(&this.tick_key),
                ProcessingAction::ArmFaultCheck => {
                    let weak = Arc::downgrade(this);
                    this.scheduler.schedule_once(
                        this.fault_key.clone(),
                        this.config.fault_check_delay(),
                        Box::new(move || {
                            if let Some(shared) = weak.upgrade() {
                                Shared::fault_check(&shared);
                            }
                        }),
                    );
                }
                ProcessingAction::DisarmFaultCheck => this.scheduler.cancel(&this.fault_key),
                ProcessingAction::ScheduleHandoff {
                    processing_time_secs,
                } => {
                    let run = CompletedRun {
                        file_name: inner.source.file_name.clone(),
                        file_size: inner.source.file_size,
                        processing_time_secs,
                    };
                    info!(processing_time_secs, "processing completed");
                    let weak: Weak<Shared> = Arc::downgrade(this);
                    this.scheduler.schedule_once(
                        this.handoff_key.clone(),
                        this.config.handoff_delay(),
                        Box::new(move || {
                            if let Some(shared) = weak.upgrade() {
                                shared.hand_off(run.clone());
                            }
                        }),
                    );
                }
                ProcessingAction::CancelHandoff => this.scheduler.cancel(&this.handoff_key),
                ProcessingAction::RaiseFault(fault) => {
                    warn!(code = %fault.code, kind = %fault.kind, stage = %fault.stage, "processing fault raised");
                    inner.fault = Some(fault);
                }
            }
        }
    }

    fn tick(this: &Arc<Shared>) {
        let mut inner = this.lock();
        if inner.disposed || !inner.state.is_running() {
            return;
        }
        let increment = this.random.uniform(this.config.max_increment);
        Shared::dispatch(this, &mut inner, ProcessingEvent::Tick { increment });

        let code_step = this.random.uniform(5.0);
        inner.code_generation_progress = (inner.code_generation_progress + code_step).min(100.0);
        debug!(
            progress = inner.state.progress,
            stage = %inner.state.current_stage,
            eta = inner.state.estimated_time_remaining,
            "processing tick"
        );
    }

    fn fault_check(this: &Arc<Shared>) {
        let mut inner = this.lock();
        if inner.disposed || inner.fault_checked {
            return;
        }
        inner.fault_checked = true;
        if inner.state.status != ProcessingStatus::Processing {
            debug!(status = ?inner.state.status, "fault check skipped");
            return;
        }
        if !this.random.chance(this.config.fault_probability) {
            debug!("fault check passed");
            return;
        }
        let kinds = FailureKind::INJECTABLE;
        let kind = kinds[this.random.pick_index(kinds.len())];
        let raised_at_ms = this.clock.now_ms();
        Shared::dispatch(
            this,
            &mut inner,
            ProcessingEvent::FaultInjected { kind, raised_at_ms },
        );
    }

    fn hand_off(&self, run: CompletedRun) {
        let mut inner = self.lock();
        if inner.disposed || inner.handed_off || inner.state.status != ProcessingStatus::Completed {
            return;
        }
        inner.handed_off = true;
        drop(inner);
        info!(file = %run.file_name, processing_time_secs = run.processing_time_secs, "handing off to download center");
        self.navigator
            .navigate(Navigation::to(Route::DownloadCenter).with_completed_run(run));
    }

    /// Returns `true` the first time it is called.
    fn dispose(&self) -> bool {
        let mut inner = self.lock();
        if inner.disposed {
            return false;
        }
        inner.disposed = true;
        self.scheduler.cancel_scope(&self.scope);
        info!(scope = %self.scope, "processing run discarded");
        true
    }
}
