use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    MissingDocument { collection: String, id: String },

    #[error("Invalid document {collection}/{id}: {reason}")]
    InvalidDocument {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    #[error("Not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn validation(reason: impl Into<String>) -> Self {
        DomainError::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        DomainError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
