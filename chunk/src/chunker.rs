//! Splits extracted text blocks into section-aware, page-bounded chunks.

use unicode_segmentation::UnicodeSegmentation;

use guardrail_extract::TextBlock;

use crate::error::Result;
use crate::heading::is_heading;

/// A chunk of text with its page and section context, not yet classified
/// or embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// The chunk's normalized text.
    pub text: String,
    /// 1-based page number. A chunk never spans more than one page.
    pub page_number: u32,
    /// Nearest heading above this chunk, if any.
    pub section_title: Option<String>,
}

/// Target chunk sizes and overlap ratio.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Soft minimum chunk size in characters.
    pub min_chars: usize,
    /// Soft maximum chunk size in characters.
    pub max_chars: usize,
    /// Fraction of `max_chars` carried over into the next chunk as overlap.
    pub overlap_ratio: f32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chars: 500,
            max_chars: 1000,
            overlap_ratio: 0.15,
        }
    }
}

/// Splits a page's text into paragraphs, tracking heading transitions as
/// it goes.
struct Paragraph {
    section_title: Option<String>,
    text: String,
}

fn paragraphs_with_sections(page_text: &str, carried_section: Option<String>) -> Vec<Paragraph> {
    let mut current_section = carried_section;
    let mut out = Vec::new();

    for raw_paragraph in page_text.split("\n\n") {
        let mut lines: Vec<&str> = raw_paragraph.lines().collect();
        if lines.is_empty() {
            continue;
        }
        if is_heading(lines[0]) {
            current_section = Some(lines[0].trim().to_string());
            lines.remove(0);
        }
        let body = lines.join(" ").trim().to_string();
        if body.is_empty() {
            continue;
        }
        out.push(Paragraph {
            section_title: current_section.clone(),
            text: body,
        });
    }
    out
}

/// Splits paragraphs (assumed all from the same page) into chunks,
/// preferring paragraph breaks, then sentence breaks, then a hard cut,
/// never crossing a section transition without flushing first.
fn chunk_page(page_number: u32, paragraphs: &[Paragraph], config: &ChunkerConfig) -> Vec<RawChunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_section: Option<String> = None;

    let flush = |buffer: &mut String, section: &Option<String>, chunks: &mut Vec<RawChunk>| {
        let trimmed = buffer.trim();
        if !trimmed.is_empty() {
            chunks.push(RawChunk {
                text: trimmed.to_string(),
                page_number,
                section_title: section.clone(),
            });
        }
        buffer.clear();
    };

    for paragraph in paragraphs {
        let section_changed = !buffer.is_empty() && buffer_section != paragraph.section_title;
        if section_changed {
            flush(&mut buffer, &buffer_section, &mut chunks);
        }
        buffer_section = paragraph.section_title.clone();

        if paragraph.text.len() > config.max_chars {
            // A single paragraph too large for one chunk: flush what we
            // have, then split the paragraph itself by sentence, falling
            // back to a hard cut for any sentence still too long.
            flush(&mut buffer, &buffer_section, &mut chunks);
            for sentence_chunk in split_oversized(&paragraph.text, config) {
                chunks.push(RawChunk {
                    text: sentence_chunk,
                    page_number,
                    section_title: paragraph.section_title.clone(),
                });
            }
            continue;
        }

        let would_be = if buffer.is_empty() {
            paragraph.text.len()
        } else {
            buffer.len() + 1 + paragraph.text.len()
        };

        if would_be > config.max_chars && buffer.len() >= config.min_chars {
            let overlap = overlap_tail(&buffer, config);
            flush(&mut buffer, &buffer_section, &mut chunks);
            buffer.push_str(&overlap);
        }

        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(&paragraph.text);
    }

    flush(&mut buffer, &buffer_section, &mut chunks);
    chunks
}

fn overlap_tail(buffer: &str, config: &ChunkerConfig) -> String {
    let overlap_len = ((config.max_chars as f32) * config.overlap_ratio) as usize;
    if overlap_len == 0 || buffer.len() <= overlap_len {
        return String::new();
    }
    let start = buffer.len() - overlap_len;
    let boundary = buffer[start..]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map_or(start, |(i, _)| start + i);
    let mut tail = buffer[boundary..].trim_start().to_string();
    if !tail.is_empty() {
        tail.push(' ');
    }
    tail
}

fn split_oversized(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let sentences: Vec<&str> = text.unicode_sentences().collect();
    let mut out = Vec::new();
    let mut buffer = String::new();

    for sentence in sentences {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence.len() > config.max_chars {
            if !buffer.is_empty() {
                out.push(std::mem::take(&mut buffer));
            }
            for hard_chunk in hard_cut(sentence, config.max_chars) {
                out.push(hard_chunk);
            }
            continue;
        }
        let would_be = if buffer.is_empty() {
            sentence.len()
        } else {
            buffer.len() + 1 + sentence.len()
        };
        if would_be > config.max_chars && !buffer.is_empty() {
            out.push(std::mem::take(&mut buffer));
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(sentence);
    }
    if !buffer.is_empty() {
        out.push(buffer);
    }
    out
}

fn hard_cut(text: &str, max_chars: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

/// Splits a document's extracted text blocks into [`RawChunk`]s.
///
/// Blocks are processed in order; a section heading detected on one page
/// carries forward as the starting section context for the next page
/// (policies routinely run a section across a page break), but a chunk
/// itself never spans two pages.
pub fn chunk_blocks(blocks: &[TextBlock], config: &ChunkerConfig) -> Result<Vec<RawChunk>> {
    let mut all = Vec::new();
    let mut carried_section = None;

    for block in blocks {
        let paragraphs = paragraphs_with_sections(&block.text, carried_section.clone());
        carried_section = paragraphs.last().and_then(|p| p.section_title.clone());
        if carried_section.is_none() {
            carried_section = block.section_hint.clone();
        }
        all.extend(chunk_page(block.page_number, &paragraphs, config));
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(page: u32, text: &str) -> TextBlock {
        TextBlock {
            text: text.to_string(),
            page_number: page,
            section_hint: None,
        }
    }

    #[test]
    fn single_short_paragraph_is_one_chunk() {
        let blocks = vec![block(1, "Short paragraph of policy text.")];
        let chunks = chunk_blocks(&blocks, &ChunkerConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_number, 1);
    }

    #[test]
    fn chunk_never_spans_pages() {
        let blocks = vec![
            block(1, &"Alpha sentence. ".repeat(40)),
            block(2, &"Beta sentence. ".repeat(40)),
        ];
        let chunks = chunk_blocks(&blocks, &ChunkerConfig::default()).unwrap();
        assert!(chunks.iter().any(|c| c.page_number == 1));
        assert!(chunks.iter().any(|c| c.page_number == 2));
        for chunk in &chunks {
            assert!(chunk.page_number == 1 || chunk.page_number == 2);
        }
    }

    #[test]
    fn section_heading_attached_to_following_chunk() {
        let blocks = vec![block(
            1,
            "EXCLUSIONS\n\nFlood damage is not covered under this policy at all.",
        )];
        let chunks = chunk_blocks(&blocks, &ChunkerConfig::default()).unwrap();
        assert_eq!(chunks[0].section_title.as_deref(), Some("EXCLUSIONS"));
    }

    #[test]
    fn oversized_paragraph_is_split() {
        let long_paragraph = "This is one sentence that repeats. ".repeat(80);
        let blocks = vec![block(1, &long_paragraph)];
        let config = ChunkerConfig {
            min_chars: 100,
            max_chars: 300,
            overlap_ratio: 0.15,
        };
        let chunks = chunk_blocks(&blocks, &config).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 320, "chunk too large: {}", chunk.text.len());
        }
    }
}
