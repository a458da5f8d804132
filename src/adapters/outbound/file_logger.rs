use crate::domains::logger::{DomainLogger, FileLogger};
use std::sync::Arc;

/// Initialize `fast_log` for `path` and return the logger the engine gets injected with.
pub fn init_file_logger(path: &str, level: log::LevelFilter) -> Result<Arc<dyn DomainLogger>, String> {
    FileLogger::init(path, level).map_err(|e| format!("Failed to initialize fast_log at {}: {}", path, e))?;
    Ok(Arc::new(FileLogger))
}
