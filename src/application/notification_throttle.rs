use crate::common::{millis, DynClock};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_COOLDOWN_MS: u64 = 3_000;

/// Suppresses repeats of the same user-facing message within a cooldown window.
///
/// The map grows with the number of distinct messages, which is a small fixed vocabulary.
pub struct NotificationThrottle {
    clock: DynClock,
    default_cooldown: Duration,
    last_shown: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl NotificationThrottle {
    pub fn new(clock: DynClock, default_cooldown_ms: u64) -> Self {
        Self {
            clock,
            default_cooldown: millis(default_cooldown_ms),
            last_shown: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_cooldown(&self) -> Duration {
        self.default_cooldown
    }

    /// `true` (and records now) iff more than `cooldown` has passed since `message` was last let through.
    pub fn should_notify(&self, message: &str, cooldown: Duration) -> bool {
        let now = self.clock.now();
        let mut last_shown = self.last_shown.lock().unwrap_or_else(|e| e.into_inner());
        match last_shown.get(message) {
            Some(last) if now - *last <= cooldown => false,
            _ => {
                last_shown.insert(message.to_string(), now);
                true
            }
        }
    }

    pub fn should_notify_default(&self, message: &str) -> bool {
        self.should_notify(message, self.default_cooldown)
    }
}
