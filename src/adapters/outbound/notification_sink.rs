use crate::domains::logger::DynLogger;
use crate::domains::notifier::Notifier;
use std::sync::Arc;

/// Notifier for headless runs: user-facing messages end up in the domain log.
pub struct LoggingNotifier {
    logger: DynLogger,
}

impl LoggingNotifier {
    pub fn new(logger: DynLogger) -> Self {
        Self { logger }
    }
}

impl Notifier for LoggingNotifier {
    fn error(&self, message: &str) {
        self.logger.error(&format!("[notify] {}", message));
    }

    fn info(&self, message: &str) {
        self.logger.info(&format!("[notify] {}", message));
    }

    fn success(&self, message: &str) {
        self.logger.info(&format!("[notify:ok] {}", message));
    }
}

pub fn init_logging_notifier(logger: DynLogger) -> Arc<dyn Notifier> {
    Arc::new(LoggingNotifier::new(logger))
}
