//! Extracts ordered text blocks from policy PDFs.
//!
//! The extractor prefers a document's native, machine-readable text layer
//! and falls back to OCR per page when that layer is absent or too poor
//! to trust (`spec` §4.1). The concrete OCR backend is a capability trait,
//! [`OcrBackend`]; this workspace ships only [`NullOcrBackend`], the
//! default used when no OCR backend is configured.

mod error;
mod model;
mod ocr;
mod parser;

pub use error::{ExtractError, Result};
pub use model::{ExtractOptions, ExtractedDocument, OcrMode, PageMode, TextBlock};
pub use ocr::{NullOcrBackend, OcrBackend};

/// Extracts text blocks from PDF bytes.
///
/// A page that fails extraction is simply absent from the result's
/// `blocks` — per `spec` §4.1/§7, missing pages are holes, not fatal
/// errors. The whole call only fails if the document itself cannot be
/// parsed as a PDF.
pub fn extract_text_blocks(
    document_bytes: &[u8],
    options: &ExtractOptions,
    ocr: &dyn OcrBackend,
) -> Result<ExtractedDocument> {
    parser::extract(document_bytes, options, ocr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pdf_bytes_error() {
        let result = extract_text_blocks(b"not-a-pdf", &ExtractOptions::default(), &NullOcrBackend);
        assert!(result.is_err());
    }
}
