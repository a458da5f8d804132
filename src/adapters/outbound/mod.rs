pub mod buffered_logger;
pub mod console_logger;
pub mod file_logger;
pub mod multi_logger;
pub mod noop_logger;
pub mod notification_sink;

pub use buffered_logger::*;
pub use console_logger::*;
pub use file_logger::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use notification_sink::*;
