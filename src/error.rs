//! Error types for log ingestion and the query layer.

use thiserror::Error;

/// Result type alias for logsight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store, ingestion and query operations
#[derive(Debug, Error)]
pub enum Error {
    /// The log store could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement failed to execute
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Directory-level ingestion failure
    #[error("Ingestion error: {0}")]
    Ingest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the store itself is unavailable.
    ///
    /// The HTTP layer turns these into the `Database connection failed`
    /// payload; everything else is reported as an internal error.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Error::ConnectionFailed(_))
    }
}
