pub mod clock;
pub mod document;
pub mod error;
pub mod timestamp;

pub use clock::*;
pub use document::*;
pub use error::*;
pub use timestamp::*;
