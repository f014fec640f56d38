use thiserror::Error;

/// Errors from chunking and classification.
///
/// Chunking operates on already-extracted text, so the only failure mode
/// is malformed input; classification failures are not propagated as
/// errors (a provider that cannot classify falls back to the heuristic
/// prior, per `spec` §4.2).
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The input block sequence could not be chunked, e.g. a page number
    /// of zero (page numbers are 1-based).
    #[error("chunking failed: {0}")]
    Chunking(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, ChunkError>;
