//! Upload workspace.
//!
//! Owns the files selected for upload and runs their simulated transfers one
//! at a time on a single repeating tick.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, info_span, warn};

use pf_core::config::UploadConfig;
use pf_core::ids::FileId;
use pf_core::ports::{PreviewResourcePort, RandomSourcePort, SchedulerPort, TimerKey};
use pf_core::upload::{
    FileValidationError, FileValidator, SelectedFile, TransferState, UploadAction, UploadEvent,
    UploadStateMachine, UploadStatus, UploadableFile,
};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("file not found: {0}")]
    NotFound(FileId),
    #[error("file {file_id} cannot be retried while {status:?}")]
    NotRetryable {
        file_id: FileId,
        status: UploadStatus,
    },
    #[error("upload workspace has been torn down")]
    Disposed,
}

/// Result of a submission: what was accepted and what was rejected.
#[derive(Debug, Clone, Default)]
pub struct SubmitReport {
    pub accepted: Vec<FileId>,
    pub rejected: Vec<FileValidationError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub total: usize,
    pub pending: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub is_uploading: bool,
}

pub struct UploadWorkspace {
    shared: Arc<Shared>,
}

struct Shared {
    config: UploadConfig,
    validator: FileValidator,
    scheduler: Arc<dyn SchedulerPort>,
    random: Arc<dyn RandomSourcePort>,
    previews: Arc<dyn PreviewResourcePort>,
    scope: String,
    tick_key: TimerKey,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    files: Vec<UploadableFile>,
    queue: VecDeque<FileId>,
    active: Option<FileId>,
    last_errors: Vec<FileValidationError>,
    ticking: bool,
    disposed: bool,
}

impl Inner {
    fn position(&self, id: &FileId) -> Option<usize> {
        self.files.iter().position(|f| &f.id == id)
    }

    fn has_work(&self) -> bool {
        self.active.is_some() || !self.queue.is_empty()
    }
}

impl UploadWorkspace {
    pub fn new(
        config: UploadConfig,
        scheduler: Arc<dyn SchedulerPort>,
        random: Arc<dyn RandomSourcePort>,
        previews: Arc<dyn PreviewResourcePort>,
    ) -> Self {
        let scope = format!("upload-{}", uuid::Uuid::new_v4());
        let tick_key = TimerKey::new(&scope, "tick");
        Self {
            shared: Arc::new(Shared {
                validator: FileValidator::new(config.max_file_size_bytes),
                config,
                scheduler,
                random,
                previews,
                scope,
                tick_key,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Validates a selection, registers the valid files and queues them.
    ///
    /// Rejected files never enter the workspace; they are reported back and
    /// kept as the latest validation errors.
    pub fn submit_files(&self, files: Vec<SelectedFile>) -> Result<SubmitReport, UploadError> {
        let span = info_span!("usecase.upload_workspace.submit_files", count = files.len());
        let _enter = span.enter();

        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.disposed {
            return Err(UploadError::Disposed);
        }

        let (accepted, rejected) = shared.validator.partition(files);
        for error in &rejected {
            warn!(file = %error.file_name, reason = %error.reason, "file rejected");
        }

        let mut report = SubmitReport {
            accepted: Vec::with_capacity(accepted.len()),
            rejected: rejected.clone(),
        };
        for selected in accepted {
            let preview = if selected.is_image() {
                shared.previews.acquire(&selected)
            } else {
                None
            };
            let file = UploadableFile::register(FileId::new(), &selected, preview);
            info!(file_id = %file.id, name = %file.name, size = file.size, "file registered");
            inner.queue.push_back(file.id.clone());
            report.accepted.push(file.id.clone());
            inner.files.push(file);
        }
        inner.last_errors = rejected;

        Shared::ensure_ticking(shared, &mut inner);
        Ok(report)
    }

    /// Advances the active transfer by one step.
    ///
    /// Normally driven by the scheduler; exposed so callers can step the
    /// simulation directly.
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// Re-queues a failed file for another transfer.
    pub fn retry(&self, file_id: &FileId) -> Result<(), UploadError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.disposed {
            return Err(UploadError::Disposed);
        }
        shared.requeue(&mut inner, file_id)?;
        Shared::ensure_ticking(shared, &mut inner);
        Ok(())
    }

    /// Re-queues every failed file in display order. Returns how many were queued.
    pub fn retry_failed(&self) -> Result<usize, UploadError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.disposed {
            return Err(UploadError::Disposed);
        }
        let failed: Vec<FileId> = inner
            .files
            .iter()
            .filter(|f| f.status() == UploadStatus::Error)
            .map(|f| f.id.clone())
            .collect();
        for id in &failed {
            shared.requeue(&mut inner, id)?;
        }
        Shared::ensure_ticking(shared, &mut inner);
        Ok(failed.len())
    }

    /// Drops a file in any status and releases its preview.
    ///
    /// Returns `false` when the file is already gone.
    pub fn remove(&self, file_id: &FileId) -> bool {
        let shared = &self.shared;
        let mut inner = shared.lock();
        let Some(index) = inner.position(file_id) else {
            return false;
        };
        let mut file = inner.files.remove(index);
        inner.queue.retain(|id| id != file_id);
        if inner.active.as_ref() == Some(file_id) {
            inner.active = None;
        }
        if let Some(handle) = file.preview.take() {
            shared.previews.release(&handle);
        }
        info!(file_id = %file_id, "file removed");
        if !inner.has_work() {
            shared.stop_ticking(&mut inner);
        }
        true
    }

    /// Drops every file and forgets the last validation errors.
    pub fn clear_all(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        shared.release_all(&mut inner);
        inner.last_errors.clear();
        shared.stop_ticking(&mut inner);
        info!("workspace cleared");
    }

    /// Stops the simulation for good and releases every preview.
    pub fn teardown(&self) {
        self.shared.teardown();
    }

    pub fn files(&self) -> Vec<UploadableFile> {
        self.shared.lock().files.clone()
    }

    pub fn file(&self, file_id: &FileId) -> Option<UploadableFile> {
        let inner = self.shared.lock();
        inner.files.iter().find(|f| &f.id == file_id).cloned()
    }

    /// Files that finished uploading, in display order.
    pub fn uploaded_files(&self) -> Vec<UploadableFile> {
        self.shared
            .lock()
            .files
            .iter()
            .filter(|f| f.status() == UploadStatus::Uploaded)
            .cloned()
            .collect()
    }

    pub fn validation_errors(&self) -> Vec<FileValidationError> {
        self.shared.lock().last_errors.clone()
    }

    pub fn stats(&self) -> UploadStats {
        let inner = self.shared.lock();
        let mut stats = UploadStats {
            total: inner.files.len(),
            is_uploading: inner.has_work(),
            ..UploadStats::default()
        };
        for file in &inner.files {
            match file.status() {
                UploadStatus::Pending => stats.pending += 1,
                UploadStatus::Uploaded => stats.uploaded += 1,
                UploadStatus::Error => stats.failed += 1,
                UploadStatus::Uploading => {}
            }
        }
        stats
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }
}

impl Drop for UploadWorkspace {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_ticking(this: &Arc<Shared>, inner: &mut Inner) {
        if inner.ticking || inner.disposed || !inner.has_work() {
            return;
        }
        inner.ticking = true;
        let weak: Weak<Shared> = Arc::downgrade(this);
        this.scheduler.schedule_repeating(
            this.tick_key.clone(),
            this.config.tick_interval(),
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.tick();
                }
            }),
        );
        debug!(key = %this.tick_key, "upload ticking started");
    }

    fn stop_ticking(&self, inner: &mut Inner) {
        if inner.ticking {
            inner.ticking = false;
            self.scheduler.cancel(&self.tick_key);
            debug!(key = %self.tick_key, "upload ticking stopped");
        }
    }

    fn tick(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }

        if inner.active.is_none() {
            let next = self.next_queued(&mut inner);
            inner.active = next;
        }
        let Some(active) = inner.active.clone() else {
            self.stop_ticking(&mut inner);
            return;
        };
        let Some(index) = inner.position(&active) else {
            inner.active = None;
            return;
        };

        let increment = self.random.uniform(self.config.max_increment);
        let state = inner.files[index].state.clone();
        let (mut next, mut actions) =
            UploadStateMachine::transition(state, UploadEvent::Tick { increment });

        if actions.contains(&UploadAction::ResolveOutcome) {
            let failed = self.random.chance(self.config.failure_probability);
            let (resolved, resolve_actions) =
                UploadStateMachine::transition(next, UploadEvent::Resolve { failed });
            next = resolved;
            actions = resolve_actions;
        }
        debug!(file_id = %active, progress = next.progress(), "upload tick");
        inner.files[index].state = next;

        for action in actions {
            if let UploadAction::TransferFinished { succeeded } = action {
                if succeeded {
                    info!(file_id = %active, "upload finished");
                } else {
                    warn!(file_id = %active, "upload failed");
                }
                inner.active = None;
            }
        }

        if !inner.has_work() {
            self.stop_ticking(&mut inner);
        }
    }

    /// Pops the next queued file that is still waiting.
    fn next_queued(&self, inner: &mut Inner) -> Option<FileId> {
        while let Some(id) = inner.queue.pop_front() {
            let waiting = inner
                .files
                .iter()
                .any(|f| f.id == id && f.state == TransferState::Pending);
            if waiting {
                return Some(id);
            }
        }
        None
    }

    fn requeue(&self, inner: &mut Inner, file_id: &FileId) -> Result<(), UploadError> {
        let index = inner
            .position(file_id)
            .ok_or_else(|| UploadError::NotFound(file_id.clone()))?;
        let file = &mut inner.files[index];
        let status = file.status();
        let (next, actions) = UploadStateMachine::transition(file.state.clone(), UploadEvent::Retry);
        if !actions.contains(&UploadAction::Enqueue) {
            return Err(UploadError::NotRetryable {
                file_id: file_id.clone(),
                status,
            });
        }
        file.state = next;
        inner.queue.push_back(file_id.clone());
        info!(file_id = %file_id, "upload retry queued");
        Ok(())
    }

    fn release_all(&self, inner: &mut Inner) {
        for mut file in inner.files.drain(..) {
            if let Some(handle) = file.preview.take() {
                self.previews.release(&handle);
            }
        }
        inner.queue.clear();
        inner.active = None;
    }

    fn teardown(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        self.stop_ticking(&mut inner);
        self.scheduler.cancel_scope(&self.scope);
        self.release_all(&mut inner);
        info!(scope = %self.scope, "upload workspace torn down");
    }
}
