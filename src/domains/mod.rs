pub mod assignment;
pub mod logger;
pub mod notifier;
pub mod selection;

pub use assignment::*;
pub use logger::*;
pub use notifier::*;
pub use selection::*;
