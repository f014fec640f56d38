//! The OCR capability contract.
//!
//! The concrete OCR backend is out of scope for this workspace (see
//! `spec` §1): only the trait is specified here. [`NullOcrBackend`] is the
//! default — it always declines, which makes `OcrMode::Auto`/`Force`
//! degrade to "no text for this page" rather than a compile-time
//! dependency on a real OCR engine.

/// Recognizes text in a rendered page image.
///
/// Implementations are expected to be pure functions of the image bytes:
/// no page-numbering or document-level state is threaded through this
/// trait, since the extractor already knows which page it is recognizing.
pub trait OcrBackend: Send + Sync {
    /// Attempts to recognize text on one page of a document.
    ///
    /// The backend owns rendering: it receives the raw document bytes and
    /// a 1-based page number rather than a pre-rendered image, so that
    /// rendering (which PDF library, what DPI, whether to cache rendered
    /// pages) is entirely the backend's concern.
    ///
    /// Returns `Ok(None)` when the backend has nothing to contribute (for
    /// example, the null backend, or a real backend that found no text),
    /// which the extractor treats the same as an extraction hole.
    fn recognize(&self, document: &[u8], page_number: u32) -> crate::error::Result<Option<String>>;
}

/// The default [`OcrBackend`]: declines every page.
///
/// Used whenever no real OCR backend is configured. Combined with
/// `OcrMode::Off` (the default `ExtractOptions`), this backend is never
/// even consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOcrBackend;

impl OcrBackend for NullOcrBackend {
    fn recognize(&self, _document: &[u8], _page_number: u32) -> crate::error::Result<Option<String>> {
        Ok(None)
    }
}
