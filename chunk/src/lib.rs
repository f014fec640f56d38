//! Splits extracted policy text into section-aware chunks and assigns
//! each a semantic [`ChunkKind`].
//!
//! This crate has two stages, run in sequence: [`chunker::chunk_blocks`]
//! splits a document's [`guardrail_extract::TextBlock`]s into
//! appropriately sized, section-tagged [`chunker::RawChunk`]s, and
//! [`classifier::classify_chunks`] assigns each one a [`ChunkKind`] using
//! a heuristic prior optionally refined by an LLM.

#![warn(missing_docs)]

pub mod chunker;
pub mod classifier;
pub mod error;
pub mod heading;

pub use chunker::{ChunkerConfig, RawChunk, chunk_blocks};
pub use classifier::{ClassifierConfig, ClassifiedChunk, classify_chunks, heuristic_prior};
pub use error::{ChunkError, Result};

use guardrail_core::llm::LlmProvider;
use guardrail_extract::TextBlock;

/// Runs both stages: chunks the blocks, then classifies the result.
pub async fn chunk_and_classify<L: LlmProvider>(
    blocks: &[TextBlock],
    chunker_config: &ChunkerConfig,
    llm: Option<&L>,
    classifier_config: &ClassifierConfig,
) -> Result<Vec<ClassifiedChunk>> {
    let raw = chunk_blocks(blocks, chunker_config)?;
    Ok(classify_chunks(raw, llm, classifier_config).await)
}
