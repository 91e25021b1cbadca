//! Error types for the storage crate

use thiserror::Error;

/// Errors returned by object store implementations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested key does not exist in the bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The store rejected or failed the request
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The store could not be configured
    #[error("Storage configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
