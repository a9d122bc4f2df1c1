//! Reconciles the OAuth redirect with the session holder.
//!
//! Phases run in a fixed order and the first one that reaches a verdict
//! decides the outcome: provider error, existing session, authorization code,
//! access token, nothing found. Every outcome ends with exactly one delayed
//! navigation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use pf_core::auth::{
    AuthCallbackOutcome, AuthCallbackResult, CallbackDebugInfo, CallbackErrorKind, CallbackParams,
    CallbackPhase, ProviderError, ScheduledRedirect, SessionError,
};
use pf_core::config::AuthConfig;
use pf_core::navigation::{Navigation, Route};
use pf_core::ports::{
    ClockPort, DelayPort, NavigatorPort, SchedulerPort, SessionHolderPort, TimerKey,
};

const TIMER_SCOPE: &str = "auth_callback";

pub struct ReconcileAuthCallback {
    config: AuthConfig,
    session: Arc<dyn SessionHolderPort>,
    delay: Arc<dyn DelayPort>,
    scheduler: Arc<dyn SchedulerPort>,
    navigator: Arc<dyn NavigatorPort>,
    clock: Arc<dyn ClockPort>,
    redirect_key: TimerKey,
}

impl ReconcileAuthCallback {
    pub fn new(
        config: AuthConfig,
        session: Arc<dyn SessionHolderPort>,
        delay: Arc<dyn DelayPort>,
        scheduler: Arc<dyn SchedulerPort>,
        navigator: Arc<dyn NavigatorPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            config,
            session,
            delay,
            scheduler,
            navigator,
            clock,
            redirect_key: TimerKey::new(TIMER_SCOPE, "redirect"),
        }
    }

    #[tracing::instrument(name = "usecase.reconcile_auth_callback.execute", skip(self))]
    pub async fn execute(&self, callback_url: &str) -> AuthCallbackResult {
        debug!(phase = CallbackPhase::Initializing.as_str(), "reconciling auth callback");
        let captured_at = self.captured_at();
        let (outcome, snapshot) = match CallbackParams::parse(callback_url) {
            Ok(params) => {
                let snapshot = params.debug_info(captured_at);
                debug!(params = ?snapshot, "callback parameters");
                (self.reconcile(&params).await, snapshot)
            }
            Err(err) => {
                error!(error = %err, "callback url could not be parsed");
                (
                    AuthCallbackOutcome::Error {
                        kind: CallbackErrorKind::Unexpected,
                        message: format!(
                            "An unexpected error occurred while processing authentication: {err}"
                        ),
                    },
                    CallbackDebugInfo::unparsed(callback_url, captured_at),
                )
            }
        };

        let redirect = self.redirect_for(&outcome);
        self.schedule_redirect(&redirect);
        AuthCallbackResult {
            outcome,
            debug: snapshot,
            redirect,
        }
    }

    /// Defuses a redirect that has not fired yet.
    pub fn cancel_pending_redirect(&self) {
        self.scheduler.cancel(&self.redirect_key);
    }

    async fn reconcile(&self, params: &CallbackParams) -> AuthCallbackOutcome {
        if let Some(code) = params.query_then_fragment("error") {
            let description = params
                .query_then_fragment("error_description")
                .map(str::to_string);
            let provider_error = ProviderError::new(code, description);
            warn!(phase = CallbackPhase::ProviderError.as_str(), code = %provider_error.code, kind = ?provider_error.kind, "provider returned an error");
            return AuthCallbackOutcome::Error {
                kind: CallbackErrorKind::Provider(provider_error.kind),
                message: provider_error.message(&self.config.app_origin),
            };
        }

        debug!(phase = CallbackPhase::CheckingSession.as_str(), "checking for existing session");
        match self.session.get_session().await {
            Err(err) => {
                return session_failure(
                    CallbackErrorKind::SessionQuery,
                    "An error occurred while checking the session",
                    &err,
                )
            }
            Ok(Some(session)) => {
                info!(user = ?session.user.email, provider = session.user.provider_or_email(), "found existing session");
                return AuthCallbackOutcome::SessionFound { user: session.user };
            }
            Ok(None) => {}
        }

        if let Some(auth_code) = params.query_then_fragment("code") {
            debug!(phase = CallbackPhase::ExchangingCode.as_str(), "authorization code present, exchanging");
            // A failed exchange leaves no session; the re-read below decides.
            if let Err(err) = self.session.exchange_code_for_session(auth_code).await {
                warn!(error = %err, "authorization code exchange failed");
            }
            self.delay.sleep(self.config.settling_delay()).await;
            match self.session.get_session().await {
                Err(err) => {
                    return session_failure(
                        CallbackErrorKind::CodeExchange,
                        "An error occurred while processing the authorization code",
                        &err,
                    )
                }
                Ok(Some(session)) => {
                    info!(user = ?session.user.email, "authorization code exchanged");
                    return AuthCallbackOutcome::CodeExchanged { user: session.user };
                }
                Ok(None) => debug!("no session after settling, trying tokens"),
            }
        }

        debug!(phase = CallbackPhase::CheckingToken.as_str(), "checking for access token");
        if let Some(access_token) = params.fragment_then_query("access_token") {
            let refresh_token = params.fragment_then_query("refresh_token");
            return match self.session.set_session(access_token, refresh_token).await {
                Ok(session) => {
                    info!(user = ?session.user.email, "session set from access token");
                    AuthCallbackOutcome::TokenSet { user: session.user }
                }
                Err(err) => session_failure(
                    CallbackErrorKind::TokenSet,
                    "An error occurred while setting the token",
                    &err,
                ),
            };
        }

        warn!(phase = CallbackPhase::NoData.as_str(), "no authentication data found in callback");
        AuthCallbackOutcome::no_data()
    }

    fn redirect_for(&self, outcome: &AuthCallbackOutcome) -> ScheduledRedirect {
        let (route, delay, replace) = match outcome {
            AuthCallbackOutcome::SessionFound { .. }
            | AuthCallbackOutcome::CodeExchanged { .. }
            | AuthCallbackOutcome::TokenSet { .. } => (
                Route::UploadWorkspace,
                self.config.success_redirect_delay(),
                true,
            ),
            AuthCallbackOutcome::Error {
                kind: CallbackErrorKind::Provider(_),
                ..
            } => (
                Route::Authentication,
                self.config.provider_error_redirect_delay(),
                false,
            ),
            AuthCallbackOutcome::Error { .. } | AuthCallbackOutcome::NoDataFound { .. } => (
                Route::Authentication,
                self.config.error_redirect_delay(),
                false,
            ),
        };
        ScheduledRedirect {
            route,
            delay,
            replace,
        }
    }

    fn schedule_redirect(&self, redirect: &ScheduledRedirect) {
        let navigator = Arc::clone(&self.navigator);
        let mut navigation = Navigation::to(redirect.route);
        if redirect.replace {
            navigation = navigation.replacing();
        }
        let delay: Duration = redirect.delay;
        info!(route = %redirect.route, delay_ms = delay.as_millis() as u64, "redirect scheduled");
        self.scheduler.schedule_once(
            self.redirect_key.clone(),
            delay,
            Box::new(move || navigator.navigate(navigation.clone())),
        );
    }

    fn captured_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_default()
    }
}

fn session_failure(kind: CallbackErrorKind, context: &str, err: &SessionError) -> AuthCallbackOutcome {
    error!(error = %err, ?kind, "session holder failed");
    AuthCallbackOutcome::Error {
        kind,
        message: format!("{context}: {err}"),
    }
}
