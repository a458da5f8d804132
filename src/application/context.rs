use super::{DocumentCache, NotificationThrottle};
use crate::common::{DocumentStore, DynClock, SystemClock};
use crate::config::Config;
use crate::domains::DynLogger;
use std::sync::Arc;

/// Process-scoped (or test-scoped) state shared by the engine and its callers:
/// the read cache, the notification throttle and the clock both of them use.
pub struct AssignmentContext {
    pub cache: DocumentCache,
    pub throttle: NotificationThrottle,
    pub clock: DynClock,
}

impl AssignmentContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        clock: DynClock,
        logger: DynLogger,
        cache_ttl_ms: u64,
        cooldown_ms: u64,
    ) -> Self {
        Self {
            cache: DocumentCache::new(store, clock.clone(), logger, cache_ttl_ms),
            throttle: NotificationThrottle::new(clock.clone(), cooldown_ms),
            clock,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>, logger: DynLogger) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock), logger)
    }

    pub fn with_clock(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        clock: DynClock,
        logger: DynLogger,
    ) -> Self {
        Self::new(
            store,
            clock,
            logger,
            config.cache.ttl_ms,
            config.notifications.cooldown_ms,
        )
    }
}
