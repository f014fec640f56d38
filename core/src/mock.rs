//! Deterministic in-memory implementations of the provider capability
//! traits, used by this workspace's own test suites.
//!
//! These are not meant to be used against real policy documents; they
//! exist so downstream crates can test the guardrail's control flow
//! without depending on a real embedding model or LLM.

use std::future::Future;

use async_stream::stream;

use crate::domain::ChunkKind;
use crate::embedding::{Embedding, EmbeddingProvider};
use crate::error::Result;
use crate::llm::{ComposeContext, ComposeStream, ExclusionEvaluation, InclusionEvaluation, LlmProvider};

/// A deterministic embedding provider: the vector is derived from the
/// text's length and byte sum, so identical texts always embed identically
/// and distinct texts (almost always) embed distinctly.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Creates a mock provider that produces vectors of the given length.
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn dim(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send {
        let dimension = self.dimension;
        let seed = text.bytes().map(u32::from).sum::<u32>() as f32 + text.len() as f32;
        async move {
            Ok((0..dimension)
                .map(|i| ((seed + i as f32) * 0.01).sin())
                .collect())
        }
    }
}

/// A scripted LLM provider for tests: classification follows simple
/// keyword rules, exclusion/inclusion evaluation matches on substrings of
/// the chunk text, and `compose` echoes the context back as a sentence.
#[derive(Debug, Clone, Default)]
pub struct MockLlmProvider;

impl LlmProvider for MockLlmProvider {
    fn classify_chunk(
        &self,
        text: &str,
        _heading: Option<&str>,
    ) -> impl Future<Output = Result<ChunkKind>> + Send {
        let lower = text.to_lowercase();
        async move {
            Ok(if lower.contains("exclu") {
                ChunkKind::Exclusion
            } else if lower.contains("cover") {
                ChunkKind::Inclusion
            } else {
                ChunkKind::General
            })
        }
    }

    fn evaluate_exclusion(
        &self,
        chunk_text: &str,
        item: &str,
    ) -> impl Future<Output = Result<ExclusionEvaluation>> + Send {
        let excluded = chunk_text.to_lowercase().contains(&item.to_lowercase())
            && chunk_text.to_lowercase().contains("not covered");
        async move {
            Ok(ExclusionEvaluation {
                excluded,
                confidence: if excluded { 0.9 } else { 0.1 },
                reason: if excluded {
                    "chunk text explicitly excludes this item".to_string()
                } else {
                    "no exclusion language found".to_string()
                },
            })
        }
    }

    fn evaluate_inclusion(
        &self,
        chunk_text: &str,
        item: &str,
    ) -> impl Future<Output = Result<InclusionEvaluation>> + Send {
        let covered = chunk_text.to_lowercase().contains(&item.to_lowercase())
            && chunk_text.to_lowercase().contains("cover");
        async move {
            Ok(InclusionEvaluation {
                covered,
                confidence: if covered { 0.9 } else { 0.1 },
                reason: if covered {
                    "chunk text covers this item".to_string()
                } else {
                    "no coverage language found".to_string()
                },
            })
        }
    }

    fn compose(&self, context: ComposeContext) -> ComposeStream {
        let sentence = format!(
            "{:?} for \"{}\" based on {} supporting chunk(s).",
            context.status,
            context.item,
            context.supporting_chunks.len()
        );
        Box::pin(stream! {
            for word in sentence.split(' ') {
                yield Ok(format!("{word} "));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_lite::StreamExt;

    #[tokio::test]
    async fn compose_streams_tokens() {
        let provider = MockLlmProvider;
        let context = ComposeContext {
            item: "flood damage".to_string(),
            status: crate::domain::CoverageStatus::Unknown,
            supporting_chunks: vec![],
            financials: None,
        };
        let mut stream = provider.compose(context);
        let mut out = String::new();
        while let Some(token) = stream.next().await {
            out.push_str(&token.unwrap());
        }
        assert!(out.contains("flood damage"));
    }
}
