//! Storage error types.

use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from the local keyed store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("invalid input: {0}")]
    Validation(#[from] dayseal_types::TypesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}
