//! Converting text into vectors for semantic retrieval.
//!
//! An [`EmbeddingProvider`] is the only capability the chunk store and the
//! coverage agent need from an embedding model: turn text into a fixed-
//! length vector, one text at a time or in order-preserving batches.
//! Concrete providers (OpenAI, Cohere, a local model, ...) are out of scope
//! for this workspace — downstream crates program against this trait only.

use std::future::Future;

use crate::error::Result;

/// A dense embedding vector of 32-bit floats.
pub type Embedding = Vec<f32>;

/// Converts text to vector representations for semantic retrieval.
///
/// # Implementation requirements
///
/// - [`embed`](EmbeddingProvider::embed) and
///   [`embed_batch`](EmbeddingProvider::embed_batch) must return vectors of
///   length exactly [`dim`](EmbeddingProvider::dim). Mixing dimensions from
///   different providers against the same chunk store is a fatal
///   misconfiguration, not something this trait silently tolerates.
/// - [`embed_batch`](EmbeddingProvider::embed_batch) preserves input order:
///   the vector at index `i` of the result corresponds to the text at
///   index `i` of the input.
pub trait EmbeddingProvider: Send + Sync {
    /// The length of every vector this provider returns.
    fn dim(&self) -> usize;

    /// Embeds a single piece of text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;

    /// Embeds a batch of texts, in order.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially; providers with a native batch API should override this
    /// for efficiency.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Embedding>>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }
}
