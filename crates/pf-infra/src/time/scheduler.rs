use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pf_core::ports::{SchedulerPort, TimerCallback, TimerKey};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::debug;

struct ArmedTimer {
    generation: u64,
    handle: AbortHandle,
}

type TimerTable = Arc<Mutex<HashMap<TimerKey, ArmedTimer>>>;

fn lock(timers: &TimerTable) -> MutexGuard<'_, HashMap<TimerKey, ArmedTimer>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`SchedulerPort`] backed by tokio tasks.
///
/// Every timer is a spawned task registered under its key together with a
/// generation number. Before each invocation the task commits to it under
/// the table lock, and only while its own generation is still registered.
/// Once `cancel` returns no new invocation starts; one committed just before
/// may still be running on another worker.
pub struct TokioScheduler {
    runtime: Handle,
    timers: TimerTable,
    next_generation: AtomicU64,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Binds to the runtime the caller is running on.
    pub fn current() -> anyhow::Result<Self> {
        Ok(Self::new(Handle::try_current()?))
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.timers).len()
    }

    fn arm<F>(&self, key: TimerKey, task: F)
    where
        F: FnOnce(TimerTable, TimerKey, u64) -> tokio::task::JoinHandle<()>,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        // The table stays locked while spawning so the new task cannot look
        // itself up before it is registered.
        let mut timers = lock(&self.timers);
        if let Some(previous) = timers.remove(&key) {
            previous.handle.abort();
            debug!(key = %key, "timer replaced");
        }
        let join = task(Arc::clone(&self.timers), key.clone(), generation);
        timers.insert(
            key,
            ArmedTimer {
                generation,
                handle: join.abort_handle(),
            },
        );
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Claim {
    /// Fire and keep the entry armed.
    Tick,
    /// Fire and drop the entry.
    Last,
}

/// Commits the next invocation under the table lock when the entry still
/// belongs to `generation`.
fn claim(timers: &TimerTable, key: &TimerKey, generation: u64, kind: Claim) -> bool {
    let mut guard = lock(timers);
    match guard.get(key) {
        Some(armed) if armed.generation == generation => {
            if kind == Claim::Last {
                guard.remove(key);
            }
            true
        }
        _ => false,
    }
}

impl SchedulerPort for TokioScheduler {
    fn schedule_once(&self, key: TimerKey, delay: Duration, mut callback: TimerCallback) {
        debug!(key = %key, delay_ms = delay.as_millis() as u64, "one-shot timer armed");
        let runtime = self.runtime.clone();
        self.arm(key, move |timers, key, generation| {
            runtime.spawn(async move {
                sleep(delay).await;
                if claim(&timers, &key, generation, Claim::Last) {
                    callback();
                }
            })
        });
    }

    fn schedule_repeating(&self, key: TimerKey, interval: Duration, mut callback: TimerCallback) {
        let period = interval.max(Duration::from_millis(1));
        debug!(key = %key, interval_ms = period.as_millis() as u64, "repeating timer armed");
        let runtime = self.runtime.clone();
        self.arm(key, move |timers, key, generation| {
            runtime.spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !claim(&timers, &key, generation, Claim::Tick) {
                        break;
                    }
                    callback();
                }
            })
        });
    }

    fn cancel(&self, key: &TimerKey) {
        if let Some(armed) = lock(&self.timers).remove(key) {
            armed.handle.abort();
            debug!(key = %key, "timer cancelled");
        }
    }

    fn cancel_scope(&self, scope: &str) {
        let mut timers = lock(&self.timers);
        let keys: Vec<TimerKey> = timers
            .keys()
            .filter(|key| key.in_scope(scope))
            .cloned()
            .collect();
        for key in &keys {
            if let Some(armed) = timers.remove(key) {
                armed.handle.abort();
            }
        }
        debug!(scope, cancelled = keys.len(), "timer scope cancelled");
    }

    fn is_scheduled(&self, key: &TimerKey) -> bool {
        lock(&self.timers).contains_key(key)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, armed) in lock(&self.timers).drain() {
            armed.handle.abort();
        }
    }
}
