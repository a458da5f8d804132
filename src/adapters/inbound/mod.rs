pub mod document_set;
pub mod file_document_store;
pub mod in_memory_store;

pub use document_set::*;
pub use file_document_store::*;
pub use in_memory_store::*;
