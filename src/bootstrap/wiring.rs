//! # Dependency Injection
//!
//! The only place that depends on `pf-infra` and `pf-app` at the same time.
//! It picks adapters and hands them to the use cases as port trait objects;
//! it makes no workflow decisions.

use std::sync::Arc;

use pf_app::usecases::RunSource;
use pf_app::{
    AuthSession, DownloadCenter, GetProfile, ProcessingOrchestrator, ReconcileAuthCallback,
    UpdateProfile, UploadWorkspace,
};
use pf_core::config::AppConfig;
use pf_core::navigation::Navigation;
use pf_core::ports::{
    ClockPort, DelayPort, NavigatorPort, PreviewResourcePort, ProfileStorePort, RandomSourcePort,
    SchedulerPort, SessionHolderPort,
};
use pf_infra::session::{InMemoryProfileStore, InMemorySessionHolder};
use pf_infra::supabase::{SupabaseClient, SupabaseProfileStore, SupabaseSessionHolder};
use pf_infra::{
    ChannelNavigator, InMemoryPreviewRegistry, SeededRandomSource, SystemClock,
    ThreadRandomSource, TokioDelay, TokioScheduler,
};
use tokio::sync::mpsc;
use tracing::info;

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Scheduler initialization failed: {0}")]
    SchedulerInit(String),

    #[error("Hosted backend initialization failed: {0}")]
    BackendInit(String),
}

/// Which session backend was wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Supabase,
    InMemory,
}

/// Every port implementation the commands need.
pub struct AppDeps {
    pub config: AppConfig,
    pub backend: BackendKind,
    pub scheduler: Arc<dyn SchedulerPort>,
    pub random: Arc<dyn RandomSourcePort>,
    pub clock: Arc<dyn ClockPort>,
    pub delay: Arc<dyn DelayPort>,
    pub previews: Arc<dyn PreviewResourcePort>,
    pub navigator: Arc<dyn NavigatorPort>,
    pub session: Arc<dyn SessionHolderPort>,
    pub profiles: Arc<dyn ProfileStorePort>,
}

/// Assembles the adapters. Must run inside a tokio runtime.
///
/// `seed` swaps the thread RNG for a reproducible sequence. The returned
/// receiver yields every navigation the use cases request.
pub fn wire_dependencies(
    config: AppConfig,
    seed: Option<u64>,
) -> WiringResult<(AppDeps, mpsc::UnboundedReceiver<Navigation>)> {
    let scheduler =
        TokioScheduler::current().map_err(|err| WiringError::SchedulerInit(err.to_string()))?;

    let random: Arc<dyn RandomSourcePort> = match seed {
        Some(seed) => Arc::new(SeededRandomSource::new(seed)),
        None => Arc::new(ThreadRandomSource),
    };

    let (session, profiles, backend): (
        Arc<dyn SessionHolderPort>,
        Arc<dyn ProfileStorePort>,
        BackendKind,
    ) = if config.has_supabase() {
        let client = SupabaseClient::new(&config.supabase)
            .map_err(|err| WiringError::BackendInit(format!("{err:#}")))?;
        let session: Arc<dyn SessionHolderPort> =
            Arc::new(SupabaseSessionHolder::new(client.clone()));
        let profiles: Arc<dyn ProfileStorePort> =
            Arc::new(SupabaseProfileStore::new(client, Arc::clone(&session)));
        (session, profiles, BackendKind::Supabase)
    } else {
        let session: Arc<dyn SessionHolderPort> = Arc::new(InMemorySessionHolder::new());
        let profiles: Arc<dyn ProfileStorePort> = Arc::new(InMemoryProfileStore::new());
        (session, profiles, BackendKind::InMemory)
    };
    info!(?backend, seeded = seed.is_some(), "dependencies wired");

    let (navigator, navigations) = ChannelNavigator::new();
    let deps = AppDeps {
        config,
        backend,
        scheduler: Arc::new(scheduler),
        random,
        clock: Arc::new(SystemClock),
        delay: Arc::new(TokioDelay),
        previews: Arc::new(InMemoryPreviewRegistry::new()),
        navigator: Arc::new(navigator),
        session,
        profiles,
    };
    Ok((deps, navigations))
}

impl AppDeps {
    pub fn upload_workspace(&self) -> UploadWorkspace {
        UploadWorkspace::new(
            self.config.upload.clone(),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.random),
            Arc::clone(&self.previews),
        )
    }

    pub fn processing_orchestrator(&self, source: RunSource) -> ProcessingOrchestrator {
        ProcessingOrchestrator::new(
            self.config.processing.clone(),
            source,
            Arc::clone(&self.scheduler),
            Arc::clone(&self.random),
            Arc::clone(&self.clock),
            Arc::clone(&self.navigator),
        )
    }

    pub fn auth_callback(&self) -> ReconcileAuthCallback {
        ReconcileAuthCallback::new(
            self.config.auth.clone(),
            Arc::clone(&self.session),
            Arc::clone(&self.delay),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.navigator),
            Arc::clone(&self.clock),
        )
    }

    pub fn auth_session(&self) -> AuthSession {
        AuthSession::new(Arc::clone(&self.session), self.config.auth.clone())
    }

    pub fn get_profile(&self) -> GetProfile {
        GetProfile::new(Arc::clone(&self.session), Arc::clone(&self.profiles))
    }

    pub fn update_profile(&self) -> UpdateProfile {
        UpdateProfile::new(Arc::clone(&self.session), Arc::clone(&self.profiles))
    }

    pub fn download_center(&self) -> DownloadCenter {
        DownloadCenter::with_samples(Arc::clone(&self.clock))
    }
}
