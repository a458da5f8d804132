pub mod model;
pub mod stage_key;

pub use model::*;
pub use stage_key::*;
