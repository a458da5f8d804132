use crate::config::LoggingConfig;
use crate::domains::logger::DomainLogger;
use std::sync::Arc;

/// Forwards every line to each of its sinks, in order.
pub struct MultiLogger {
    sinks: Vec<Arc<dyn DomainLogger>>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<Arc<dyn DomainLogger>>) -> Self {
        Self { sinks }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(msg));
    }
}

/// Console logger, plus the `fast_log` file logger when `logging.file` is set and it starts.
/// The result is buffered so logging never blocks an engine call.
pub fn init_combined_logger(config: &LoggingConfig) -> Arc<dyn DomainLogger> {
    let console = super::init_console_logger();
    let combined: Arc<dyn DomainLogger> = match config.file.as_deref() {
        Some(path) => match super::init_file_logger(path, config.level_filter()) {
            Ok(file_logger) => Arc::new(MultiLogger::new(vec![file_logger, console])),
            Err(e) => {
                console.warn(&e);
                console
            }
        },
        None => console,
    };
    super::init_buffered_logger(combined, config.buffer_capacity)
}
