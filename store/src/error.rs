//! Error types for the chunk store.

use thiserror::Error;

/// Errors that can occur in chunk store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An embedding's length did not match the store's declared
    /// dimension. Per `spec` §3/§7 this is a fatal misconfiguration, not
    /// something the store silently truncates or pads around.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The store's declared dimension.
        expected: usize,
        /// The dimension actually supplied.
        actual: usize,
    },

    /// A second ingestion for the same policy was attempted while one was
    /// already in flight. The store rejects rather than queues, so a
    /// caller always knows immediately whether its ingestion is running.
    #[error("ingestion already in progress for policy {0}")]
    Conflict(String),

    /// The requested chunk id does not exist.
    #[error("chunk not found: {0}")]
    NotFound(String),

    /// The persistence backend failed.
    #[error("database error: {0}")]
    Database(String),

    /// Filesystem I/O failed while opening or writing the database file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for chunk store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
