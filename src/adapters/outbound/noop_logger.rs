use crate::domains::logger::DomainLogger;
use crate::domains::notifier::Notifier;
use std::sync::Arc;

struct NoOp;

impl DomainLogger for NoOp {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

impl Notifier for NoOp {
    fn error(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
}

/// No-op logger useful as default in unit tests
pub fn init_noop_logger() -> Arc<dyn DomainLogger> {
    Arc::new(NoOp {})
}

pub fn init_noop_notifier() -> Arc<dyn Notifier> {
    Arc::new(NoOp {})
}
