use crate::domains::logger::DomainLogger;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Forwards domain log lines to `tracing`; whatever subscriber the binary installed prints them.
struct TracingBridge;

impl DomainLogger for TracingBridge {
    fn info(&self, msg: &str) {
        tracing::info!(target: "assignment", "{}", msg);
    }
    fn warn(&self, msg: &str) {
        tracing::warn!(target: "assignment", "{}", msg);
    }
    fn error(&self, msg: &str) {
        tracing::error!(target: "assignment", "{}", msg);
    }
}

/// Console-backed DomainLogger; also the fallback when the file logger cannot start.
pub fn init_console_logger() -> Arc<dyn DomainLogger> {
    Arc::new(TracingBridge {})
}

/// Installs the `tracing` fmt subscriber (`RUST_LOG`, default `info`).
///
/// Unlike `SubscriberInitExt::init` this does not claim the `log` facade, which
/// `fast_log` needs for the file logger.
pub fn init_tracing() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
