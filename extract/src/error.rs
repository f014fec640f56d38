use thiserror::Error;

/// Errors emitted by the text extraction pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input bytes do not decode as a valid PDF structure at all. This
    /// is a whole-document failure, unlike [`ExtractError::ExtractionFailed`]
    /// which is scoped to one page.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// The source document could not be read from the filesystem.
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    /// Extraction of a single page failed. Per `spec` §4.1/§7 this is
    /// logged and the page is skipped — a hole in the output, not a
    /// whole-document failure.
    #[error("extraction failed on page {page:?}: {cause}")]
    ExtractionFailed {
        /// The 1-based page number, if extraction got far enough to know
        /// which page failed.
        page: Option<u32>,
        /// A human-readable cause.
        cause: String,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, ExtractError>;
