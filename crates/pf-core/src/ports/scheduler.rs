use std::fmt;
use std::time::Duration;

/// Identifies one scheduled timer. Scheduling under a key that is already
/// armed replaces the previous timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey(String);

impl TimerKey {
    pub fn new(scope: &str, name: &str) -> Self {
        Self(format!("{scope}.{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn in_scope(&self, scope: &str) -> bool {
        self.0
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type TimerCallback = Box<dyn FnMut() + Send + 'static>;

/// Deferred and periodic work.
///
/// `cancel` must take effect synchronously: once it returns, the callback of
/// that key never starts again. An invocation that was already committed on
/// another thread may still be finishing, so callers keep their own state
/// guard (engines check their disposed flag under their own lock).
pub trait SchedulerPort: Send + Sync {
    fn schedule_once(&self, key: TimerKey, delay: Duration, callback: TimerCallback);

    /// First run happens one `interval` after scheduling.
    fn schedule_repeating(&self, key: TimerKey, interval: Duration, callback: TimerCallback);

    fn cancel(&self, key: &TimerKey);

    /// Cancels every timer whose key belongs to `scope`.
    fn cancel_scope(&self, scope: &str);

    fn is_scheduled(&self, key: &TimerKey) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_belong_to_their_scope_only() {
        let key = TimerKey::new("upload", "tick");
        assert_eq!(key.as_str(), "upload.tick");
        assert!(key.in_scope("upload"));
        assert!(!key.in_scope("up"));
        assert!(!key.in_scope("processing"));
    }
}
