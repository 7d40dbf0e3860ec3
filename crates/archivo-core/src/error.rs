//! Error types for Archivo

use thiserror::Error;

/// Main error type for Archivo operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Store is closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether the same call may succeed if simply attempted again.
    ///
    /// Storage failures (lock contention, transient I/O) and cancellations are
    /// retryable; a missing page or a malformed query will fail the same way
    /// every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Cancelled(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for Archivo operations
pub type Result<T> = std::result::Result<T, Error>;
