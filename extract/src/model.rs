use std::ops::RangeInclusive;

/// OCR fallback strategy for pages whose native text layer is poor or
/// absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrMode {
    /// Never fall back to OCR; pages without usable native text are holes.
    #[default]
    Off,
    /// Fall back to OCR only when native extraction quality is too low.
    Auto,
    /// Always OCR every page, ignoring native text quality.
    Force,
}

/// Runtime options controlling extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Optional inclusive 1-based page range to restrict extraction to.
    pub page_range: Option<RangeInclusive<usize>>,
    /// OCR fallback behavior for low-quality or textless pages.
    pub ocr_mode: OcrMode,
    /// Minimum fraction of a page considered "machine-readable" before the
    /// native text extraction path is trusted (see `spec` §4.1: native text
    /// is used when the machine-readable layer covers at least this much
    /// of the page). `lopdf` does not expose literal glyph bounding-box
    /// area, so this is evaluated against the printable-character-density
    /// proxy computed in [`crate::parser::text_quality_score`].
    pub native_text_threshold: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            page_range: None,
            ocr_mode: OcrMode::Off,
            native_text_threshold: 0.6,
        }
    }
}

/// One block of extracted text in reading order.
///
/// Blocks never cross a page boundary: a page boundary is always a block
/// boundary, even if that leaves two adjacent blocks from different pages
/// with no gap between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    /// The block's text, already whitespace-normalized.
    pub text: String,
    /// 1-based page number the block was extracted from.
    pub page_number: u32,
    /// A heading the block appeared directly under, if the extractor could
    /// tell. This is a hint only; `guardrail-chunk` does its own, more
    /// thorough heading detection over the full block sequence.
    pub section_hint: Option<String>,
}

/// How a page's text was ultimately produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// The machine-readable text layer was used directly.
    Native,
    /// OCR was used because native extraction quality was too low.
    Ocr,
}

/// The result of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Total pages in the source document.
    pub page_count: usize,
    /// Text blocks in reading order across all successfully extracted
    /// pages. Pages that failed extraction are simply absent — see
    /// `spec` §4.1: missing pages are holes, not fatal errors.
    pub blocks: Vec<TextBlock>,
    /// The mode used for each successfully extracted page, keyed by
    /// 1-based page number.
    pub page_modes: Vec<(u32, PageMode)>,
}
