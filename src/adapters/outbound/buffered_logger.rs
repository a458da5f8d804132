use crate::domains::logger::DomainLogger;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

enum Level {
    Info,
    Warn,
    Error,
}

struct LogLine {
    level: Level,
    msg: String,
}

/// Non-blocking logger: lines are queued and forwarded to `bridge` by a
/// background task. When the queue is full the line is dropped and counted.
pub struct BufferedLogger {
    sender: mpsc::Sender<LogLine>,
    dropped: AtomicU64,
}

impl BufferedLogger {
    /// Must be called inside a tokio runtime.
    pub fn spawn(bridge: Arc<dyn DomainLogger>, capacity: usize) -> Self {
        let (sender, mut rx) = mpsc::channel::<LogLine>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                match line.level {
                    Level::Info => bridge.info(&line.msg),
                    Level::Warn => bridge.warn(&line.msg),
                    Level::Error => bridge.error(&line.msg),
                }
            }
        });

        Self {
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn push(&self, level: Level, msg: &str) {
        let line = LogLine {
            level,
            msg: msg.to_string(),
        };
        if self.sender.try_send(line).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl DomainLogger for BufferedLogger {
    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }
}

pub fn init_buffered_logger(bridge: Arc<dyn DomainLogger>, capacity: usize) -> Arc<dyn DomainLogger> {
    Arc::new(BufferedLogger::spawn(bridge, capacity))
}
