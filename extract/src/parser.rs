use lopdf::Document;

use crate::error::{ExtractError, Result};
use crate::model::{ExtractOptions, ExtractedDocument, OcrMode, PageMode, TextBlock};
use crate::ocr::OcrBackend;

/// Extracts text blocks from an in-memory PDF, applying OCR fallback per
/// the given options and backend.
pub fn extract(bytes: &[u8], options: &ExtractOptions, ocr: &dyn OcrBackend) -> Result<ExtractedDocument> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))?;
    extract_document(&doc, bytes, options, ocr)
}

fn extract_document(
    doc: &Document,
    raw_bytes: &[u8],
    options: &ExtractOptions,
    ocr: &dyn OcrBackend,
) -> Result<ExtractedDocument> {
    let page_map = doc.get_pages();
    let mut page_numbers: Vec<u32> = page_map.keys().copied().collect();
    page_numbers.sort_unstable();

    let selected = select_pages(&page_numbers, options.page_range.clone());

    let mut blocks = Vec::new();
    let mut page_modes = Vec::new();

    for page_number in selected {
        match extract_page(doc, raw_bytes, page_number, options, ocr) {
            Ok(Some((block, mode))) => {
                blocks.push(block);
                page_modes.push((page_number, mode));
            }
            Ok(None) => {
                tracing::debug!(page_number, "no usable text on page");
            }
            Err(cause) => {
                tracing::warn!(page_number, %cause, "page extraction failed, treating as a hole");
            }
        }
    }

    Ok(ExtractedDocument {
        page_count: page_numbers.len(),
        blocks,
        page_modes,
    })
}

fn extract_page(
    doc: &Document,
    raw_bytes: &[u8],
    page_number: u32,
    options: &ExtractOptions,
    ocr: &dyn OcrBackend,
) -> std::result::Result<Option<(TextBlock, PageMode)>, String> {
    let native_raw = doc
        .extract_text(&[page_number])
        .unwrap_or_else(|_| String::new());
    let native = normalize_text(&native_raw);
    let quality = text_quality_score(&native);

    let use_native = match options.ocr_mode {
        OcrMode::Force => false,
        OcrMode::Off => true,
        OcrMode::Auto => quality >= options.native_text_threshold,
    };

    let (mode, text) = if use_native {
        (PageMode::Native, native)
    } else {
        let ocr_text = ocr
            .recognize(raw_bytes, page_number)
            .map_err(|e| e.to_string())?
            .map(|t| normalize_text(&t));
        match ocr_text {
            Some(text) if !text.trim().is_empty() => (PageMode::Ocr, text),
            _ if !native.trim().is_empty() => (PageMode::Native, native),
            _ => return Ok(None),
        }
    };

    if text.trim().is_empty() {
        return Ok(None);
    }

    let section_hint = first_heading_like_line(&text);

    Ok(Some((
        TextBlock {
            text,
            page_number,
            section_hint,
        },
        mode,
    )))
}

fn select_pages(pages: &[u32], range: Option<std::ops::RangeInclusive<usize>>) -> Vec<u32> {
    match range {
        None => pages.to_vec(),
        Some(range) => pages
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| {
                let page_index = idx + 1;
                if range.contains(&page_index) {
                    Some(*p)
                } else {
                    None
                }
            })
            .collect(),
    }
}

/// Trims each line and collapses runs of blank lines to a single blank
/// line, preserving paragraph breaks for downstream chunking rather than
/// erasing them entirely.
fn normalize_text(text: &str) -> String {
    let mut out = Vec::new();
    let mut last_was_blank = true; // suppress leading blank lines
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !last_was_blank {
                out.push(String::new());
            }
            last_was_blank = true;
        } else {
            out.push(trimmed.to_string());
            last_was_blank = false;
        }
    }
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out.join("\n")
}

/// A cheap proxy for "what fraction of this page is machine-readable
/// text": weighted printable-character ratio plus word density. `lopdf`
/// does not expose glyph bounding-box area, so this stands in for the
/// page-area-coverage heuristic `spec` §4.1 describes.
pub(crate) fn text_quality_score(text: &str) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    let chars = text.chars().count() as f32;
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .count() as f32;
    let words = text.split_whitespace().count() as f32;
    let printable_ratio = printable / chars;
    let density = (words / (chars / 5.0).max(1.0)).min(1.0);
    (0.7 * printable_ratio) + (0.3 * density)
}

/// Best-effort single-line section hint: the first all-caps or numbered
/// heading-looking line on the page. `guardrail-chunk` does the
/// authoritative heading scan across the full block sequence; this is
/// only a per-page hint carried alongside the block.
fn first_heading_like_line(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.len() > 80 {
            return None;
        }
        let is_all_caps = trimmed.chars().any(char::is_alphabetic)
            && trimmed.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase());
        if is_all_caps {
            Some(trimmed.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_score_of_empty_text_is_zero() {
        assert_eq!(text_quality_score(""), 0.0);
    }

    #[test]
    fn quality_score_of_dense_prose_is_high() {
        let score = text_quality_score("This is a normal sentence with many distinct words in it.");
        assert!(score > 0.6, "expected high score, got {score}");
    }

    #[test]
    fn heading_hint_picks_all_caps_line() {
        let text = "EXCLUSIONS\nThis section lists what is not covered.";
        assert_eq!(first_heading_like_line(text), Some("EXCLUSIONS".to_string()));
    }

    #[test]
    fn heading_hint_ignores_long_lines() {
        let long = "A".repeat(100);
        assert_eq!(first_heading_like_line(&long), None);
    }
}
