#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;

use pf_core::auth::{
    AuthEvent, AuthStateChange, AuthUser, OAuthRequest, Session, SessionError, SignUpMetadata,
};
use pf_core::navigation::Navigation;
use pf_core::ports::{
    ClockPort, DelayPort, NavigatorPort, PreviewResourcePort, RandomSourcePort, SessionHolderPort,
    SchedulerPort, TimerCallback, TimerKey,
};
use pf_core::upload::{PreviewHandle, SelectedFile};

// ===== Scheduler =====

struct Entry {
    due: Duration,
    interval: Option<Duration>,
    generation: u64,
    callback: Arc<Mutex<TimerCallback>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_generation: u64,
    timers: BTreeMap<TimerKey, Entry>,
}

/// Virtual-time scheduler. Callbacks run on the caller's thread during
/// `advance`, with the scheduler lock released.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn now(&self) -> Duration {
        self.state.lock().unwrap().now
    }

    pub fn pending(&self) -> Vec<TimerKey> {
        self.state.lock().unwrap().timers.keys().cloned().collect()
    }

    pub fn pending_in_scope(&self, scope_prefix: &str) -> Vec<TimerKey> {
        self.pending()
            .into_iter()
            .filter(|k| k.as_str().starts_with(scope_prefix))
            .collect()
    }

    pub fn delay_of(&self, name_suffix: &str) -> Option<Duration> {
        let state = self.state.lock().unwrap();
        state
            .timers
            .iter()
            .find(|(k, _)| k.as_str().ends_with(name_suffix))
            .map(|(_, e)| e.due - state.now)
    }

    /// Advances virtual time, firing every timer that falls due on the way.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            let fire = {
                let mut state = self.state.lock().unwrap();
                let next = state
                    .timers
                    .iter()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.generation))
                    .map(|(k, _)| k.clone());
                match next {
                    None => None,
                    Some(key) => {
                        let (due, callback, repeat) = {
                            let entry = state.timers.get(&key).unwrap();
                            (entry.due, Arc::clone(&entry.callback), entry.interval)
                        };
                        state.now = due;
                        match repeat {
                            Some(interval) => {
                                state.timers.get_mut(&key).unwrap().due = due + interval;
                            }
                            None => {
                                state.timers.remove(&key);
                            }
                        }
                        Some(callback)
                    }
                }
            };
            match fire {
                Some(callback) => {
                    let mut callback = callback.lock().unwrap();
                    (*callback)();
                }
                None => break,
            }
        }
        self.state.lock().unwrap().now = target;
    }

    /// Advances until no timers remain or `limit` elapses.
    pub fn run_until_idle(&self, step: Duration, limit: Duration) {
        let deadline = self.now() + limit;
        while !self.pending().is_empty() && self.now() < deadline {
            self.advance(step);
        }
    }

    fn insert(&self, key: TimerKey, delay: Duration, interval: Option<Duration>, callback: TimerCallback) {
        let mut state = self.state.lock().unwrap();
        state.next_generation += 1;
        let entry = Entry {
            due: state.now + delay,
            interval,
            generation: state.next_generation,
            callback: Arc::new(Mutex::new(callback)),
        };
        state.timers.insert(key, entry);
    }
}

impl SchedulerPort for ManualScheduler {
    fn schedule_once(&self, key: TimerKey, delay: Duration, callback: TimerCallback) {
        self.insert(key, delay, None, callback);
    }

    fn schedule_repeating(&self, key: TimerKey, interval: Duration, callback: TimerCallback) {
        self.insert(key, interval, Some(interval), callback);
    }

    fn cancel(&self, key: &TimerKey) {
        self.state.lock().unwrap().timers.remove(key);
    }

    fn cancel_scope(&self, scope: &str) {
        self.state
            .lock()
            .unwrap()
            .timers
            .retain(|key, _| !key.in_scope(scope));
    }

    fn is_scheduled(&self, key: &TimerKey) -> bool {
        self.state.lock().unwrap().timers.contains_key(key)
    }
}

// ===== Randomness =====

/// Replays a script of samples, then repeats `fallback`.
pub struct ScriptedRandom {
    script: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(script: impl IntoIterator<Item = f64>, fallback: f64) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
        })
    }

    pub fn constant(value: f64) -> Arc<Self> {
        Self::new([], value)
    }

    pub fn push(&self, values: impl IntoIterator<Item = f64>) {
        self.script.lock().unwrap().extend(values);
    }
}

impl RandomSourcePort for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        self.script.lock().unwrap().pop_front().unwrap_or(self.fallback)
    }
}

pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(StdRng::seed_from_u64(seed))))
    }
}

impl RandomSourcePort for SeededRandom {
    fn next_f64(&self) -> f64 {
        self.0.lock().unwrap().random::<f64>()
    }
}

// ===== Clock / delay =====

pub struct FixedClock(pub i64);

impl ClockPort for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

#[derive(Default)]
pub struct InstantDelay {
    pub slept: Mutex<Vec<Duration>>,
}

#[async_trait]
impl DelayPort for InstantDelay {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

// ===== Navigation / previews =====

#[derive(Default)]
pub struct RecordingNavigator {
    pub visits: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<Navigation> {
        self.visits.lock().unwrap().clone()
    }
}

impl NavigatorPort for RecordingNavigator {
    fn navigate(&self, navigation: Navigation) {
        self.visits.lock().unwrap().push(navigation);
    }
}

#[derive(Default)]
pub struct RecordingPreviews {
    counter: Mutex<u64>,
    pub acquired: Mutex<Vec<PreviewHandle>>,
    pub released: Mutex<Vec<PreviewHandle>>,
}

impl RecordingPreviews {
    pub fn acquired(&self) -> Vec<PreviewHandle> {
        self.acquired.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<PreviewHandle> {
        self.released.lock().unwrap().clone()
    }
}

impl PreviewResourcePort for RecordingPreviews {
    fn acquire(&self, file: &SelectedFile) -> Option<PreviewHandle> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let handle = PreviewHandle::new(format!("blob:preview/{}/{}", *counter, file.name));
        self.acquired.lock().unwrap().push(handle.clone());
        Some(handle)
    }

    fn release(&self, handle: &PreviewHandle) {
        self.released.lock().unwrap().push(handle.clone());
    }
}

// ===== Session holder =====

pub fn session_for(user_id: &str, email: &str) -> Session {
    Session {
        access_token: format!("at-{user_id}"),
        refresh_token: Some(format!("rt-{user_id}")),
        expires_at: None,
        user: AuthUser::new(user_id).with_email(email).with_provider("google"),
    }
}

/// Session holder that answers `get_session` from a script.
pub struct FakeSessionHolder {
    get_session: Mutex<VecDeque<Result<Option<Session>, SessionError>>>,
    set_session: Mutex<Option<Result<Session, SessionError>>>,
    exchange: Mutex<Option<Result<Session, SessionError>>>,
    oauth: Mutex<Option<Result<String, SessionError>>>,
    pub calls: Mutex<Vec<String>>,
    pub oauth_requests: Mutex<Vec<OAuthRequest>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl Default for FakeSessionHolder {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            get_session: Mutex::new(VecDeque::new()),
            set_session: Mutex::new(None),
            exchange: Mutex::new(None),
            oauth: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            oauth_requests: Mutex::new(Vec::new()),
            events,
        }
    }
}

impl FakeSessionHolder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_get_session(&self, results: impl IntoIterator<Item = Result<Option<Session>, SessionError>>) {
        self.get_session.lock().unwrap().extend(results);
    }

    pub fn script_set_session(&self, result: Result<Session, SessionError>) {
        *self.set_session.lock().unwrap() = Some(result);
    }

    pub fn script_exchange(&self, result: Result<Session, SessionError>) {
        *self.exchange.lock().unwrap() = Some(result);
    }

    pub fn script_oauth(&self, result: Result<String, SessionError>) {
        *self.oauth.lock().unwrap() = Some(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let _ = self.events.send(AuthStateChange { event, session });
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl SessionHolderPort for FakeSessionHolder {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        self.record("get_session");
        self.get_session.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, SessionError> {
        self.record(format!("sign_in:{email}"));
        Ok(session_for("u-password", email))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<Option<Session>, SessionError> {
        self.record(format!("sign_up:{email}:{}:{}", metadata.full_name, metadata.role));
        Ok(None)
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<String, SessionError> {
        self.record("sign_in_with_oauth");
        self.oauth_requests.lock().unwrap().push(request.clone());
        self.oauth
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("https://accounts.example/authorize".to_string()))
    }

    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, SessionError> {
        self.record(format!("exchange_code:{auth_code}"));
        self.exchange
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Err(SessionError::MissingCodeVerifier))
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Session, SessionError> {
        self.record(format!("set_session:{access_token}:{}", refresh_token.unwrap_or("-")));
        self.set_session
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(session_for("u-token", "token@example.com")))
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        self.record("sign_out");
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> Result<(), SessionError> {
        self.record(format!("reset_password:{email}:{redirect_to}"));
        Ok(())
    }

    async fn update_password(&self, _password: &str) -> Result<(), SessionError> {
        self.record("update_password");
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

pub fn png(name: &str, size: u64) -> SelectedFile {
    SelectedFile::new(name, size, "image/png")
}
