pub mod assignment_engine;
pub mod context;
pub mod document_cache;
pub mod notification_throttle;
pub mod selection_state;

pub use assignment_engine::*;
pub use context::*;
pub use document_cache::*;
pub use notification_throttle::*;
pub use selection_state::*;
