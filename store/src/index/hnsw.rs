//! Per-policy HNSW index over chunk embeddings.

use std::collections::HashMap;

use instant_distance::{Builder, HnswMap, Point, Search};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;

use guardrail_core::domain::{Chunk, ChunkId, ChunkKind};

use crate::error::{Result, StoreError};
use crate::types::{KindFilter, ScoredChunk};

#[derive(Clone, Debug)]
struct EmbeddingPoint {
    embedding: Vec<f32>,
}

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        1.0 - cosine_similarity(&self.embedding, &other.embedding)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (lhs, rhs) in a.iter().zip(b) {
        dot += lhs * rhs;
        norm_a += lhs * lhs;
        norm_b += rhs * rhs;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Maps a raw cosine similarity in `[-1, 1]` into a score in `[0, 1]`.
fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    (1.0 + cosine_similarity(a, b)) / 2.0
}

struct IndexState {
    chunks: Vec<Chunk>,
    id_to_index: HashMap<ChunkId, usize>,
    hnsw: Option<HnswMap<EmbeddingPoint, usize>>,
    dirty: bool,
}

impl IndexState {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            id_to_index: HashMap::new(),
            hnsw: None,
            dirty: false,
        }
    }

    fn rebuild(&mut self) {
        if self.chunks.is_empty() {
            self.hnsw = None;
            self.dirty = false;
            return;
        }
        let points: Vec<EmbeddingPoint> = self
            .chunks
            .iter()
            .map(|c| EmbeddingPoint {
                embedding: c.embedding.clone(),
            })
            .collect();
        let indices: Vec<usize> = (0..self.chunks.len()).collect();
        self.hnsw = Some(Builder::default().build(points, indices));
        self.dirty = false;
    }
}

/// A single policy's HNSW graph plus the chunk records it was built from.
///
/// One `PolicyIndex` exists per `policy_id`; there is no shared structure
/// between policies, so a bug in query construction cannot leak chunks
/// across the boundary the way a single shared index with a `policy_id`
/// filter could.
pub struct PolicyIndex {
    dimension: usize,
    state: RwLock<IndexState>,
}

impl std::fmt::Debug for PolicyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("PolicyIndex")
            .field("dimension", &self.dimension)
            .field("len", &state.chunks.len())
            .finish()
    }
}

impl PolicyIndex {
    /// Creates an empty index for the given embedding dimension.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(IndexState::new()),
        }
    }

    /// Inserts or replaces chunks. All-or-nothing: a dimension mismatch on
    /// any chunk leaves the index untouched.
    pub fn insert_batch(&self, chunks: Vec<Chunk>) -> Result<()> {
        for chunk in &chunks {
            if chunk.embedding.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: chunk.embedding.len(),
                });
            }
        }

        let mut state = self.state.write();
        for chunk in chunks {
            if let Some(&idx) = state.id_to_index.get(&chunk.id) {
                state.chunks[idx] = chunk;
            } else {
                let idx = state.chunks.len();
                state.id_to_index.insert(chunk.id.clone(), idx);
                state.chunks.push(chunk);
            }
        }
        state.dirty = true;
        Ok(())
    }

    /// Removes every chunk in this index. Used when a policy is deleted.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.chunks.clear();
        state.id_to_index.clear();
        state.hnsw = None;
        state.dirty = false;
    }

    /// Looks up one chunk by id.
    #[must_use]
    pub fn get(&self, chunk_id: &str) -> Option<Chunk> {
        let state = self.state.read();
        state.id_to_index.get(chunk_id).map(|&idx| state.chunks[idx].clone())
    }

    /// Number of chunks matching `kind_filter`.
    #[must_use]
    pub fn count(&self, kind_filter: &KindFilter) -> usize {
        let state = self.state.read();
        state.chunks.iter().filter(|c| kind_filter.admits(c.kind)).count()
    }

    /// Top-`k` chunks by similarity to `query`, restricted to
    /// `kind_filter`-admissible kinds, ties broken by ascending `position`.
    ///
    /// An unrestricted filter runs the approximate HNSW graph search, which
    /// is sub-linear in the number of indexed chunks. A restricted filter
    /// falls back to an exact brute-force scan over only the admissible
    /// chunks, since `instant-distance` has no native predicate pre-filter
    /// and the store's contract forbids filtering after ranking.
    pub fn similar(&self, query: &[f32], k: usize, kind_filter: &KindFilter) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut state = self.state.write();
        if state.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = if kind_filter.is_unrestricted() {
            if state.dirty || state.hnsw.is_none() {
                state.rebuild();
            }
            let Some(ref hnsw) = state.hnsw else {
                return Ok(Vec::new());
            };
            let query_point = EmbeddingPoint {
                embedding: query.to_vec(),
            };
            let mut search = Search::default();
            hnsw.search(&query_point, &mut search)
                .take(k)
                .map(|candidate| {
                    let chunk = state.chunks[*candidate.value].clone();
                    let score = cosine_score(query, &chunk.embedding);
                    ScoredChunk { chunk, score }
                })
                .collect::<Vec<_>>()
        } else {
            let mut scored: Vec<ScoredChunk> = state
                .chunks
                .iter()
                .filter(|c| kind_filter.admits(c.kind))
                .map(|c| ScoredChunk {
                    chunk: c.clone(),
                    score: cosine_score(query, &c.embedding),
                })
                .collect();
            scored.sort_by(|a, b| {
                OrderedFloat(b.score)
                    .cmp(&OrderedFloat(a.score))
                    .then_with(|| a.chunk.position.cmp(&b.chunk.position))
            });
            scored.truncate(k);
            scored
        };

        results.sort_by(|a, b| {
            OrderedFloat(b.score)
                .cmp(&OrderedFloat(a.score))
                .then_with(|| a.chunk.position.cmp(&b.chunk.position))
        });

        Ok(results)
    }

    /// All chunks currently held, for persistence round trips.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Chunk> {
        self.state.read().chunks.clone()
    }

    /// Rebuilds the index from persisted chunks, replacing any existing
    /// content.
    pub fn load(&self, chunks: Vec<Chunk>) -> Result<()> {
        for chunk in &chunks {
            if chunk.embedding.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: chunk.embedding.len(),
                });
            }
        }
        let mut state = self.state.write();
        state.chunks.clear();
        state.id_to_index.clear();
        for (idx, chunk) in chunks.into_iter().enumerate() {
            state.id_to_index.insert(chunk.id.clone(), idx);
            state.chunks.push(chunk);
        }
        state.dirty = true;
        Ok(())
    }

    /// The embedding dimension this index was constructed with.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of chunks currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().chunks.len()
    }

    /// Whether the index holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn chunk(id: &str, kind: ChunkKind, position: u32, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            policy_id: "policy-1".to_string(),
            text: format!("chunk {id}"),
            kind,
            page_number: 1,
            section_title: None,
            position,
            embedding,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_search() {
        let index = PolicyIndex::new(4);
        index
            .insert_batch(vec![
                chunk("c1", ChunkKind::General, 0, vec![1.0, 0.0, 0.0, 0.0]),
                chunk("c2", ChunkKind::General, 1, vec![0.0, 1.0, 0.0, 0.0]),
            ])
            .unwrap();

        let results = index.similar(&[1.0, 0.0, 0.0, 0.0], 1, &KindFilter::any()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "c1");
        assert!(results[0].score > 0.9);
    }

    #[test]
    fn score_is_mapped_into_unit_interval() {
        let index = PolicyIndex::new(4);
        index
            .insert_batch(vec![chunk("c1", ChunkKind::General, 0, vec![-1.0, 0.0, 0.0, 0.0])])
            .unwrap();
        let results = index.similar(&[1.0, 0.0, 0.0, 0.0], 1, &KindFilter::any()).unwrap();
        // Opposite vectors: cosine = -1, mapped score = 0.0.
        assert!((results[0].score - 0.0).abs() < 1e-5);
    }

    #[test]
    fn kind_filter_excludes_before_ranking() {
        let index = PolicyIndex::new(4);
        index
            .insert_batch(vec![
                chunk("c1", ChunkKind::Exclusion, 0, vec![1.0, 0.0, 0.0, 0.0]),
                chunk("c2", ChunkKind::Inclusion, 1, vec![1.0, 0.0, 0.0, 0.0]),
            ])
            .unwrap();
        let results = index
            .similar(&[1.0, 0.0, 0.0, 0.0], 10, &KindFilter::only([ChunkKind::Inclusion]))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "c2");
    }

    #[test]
    fn ties_break_by_ascending_position() {
        let index = PolicyIndex::new(4);
        index
            .insert_batch(vec![
                chunk("c2", ChunkKind::General, 5, vec![1.0, 0.0, 0.0, 0.0]),
                chunk("c1", ChunkKind::General, 1, vec![1.0, 0.0, 0.0, 0.0]),
            ])
            .unwrap();
        let results = index
            .similar(&[1.0, 0.0, 0.0, 0.0], 10, &KindFilter::only([ChunkKind::General]))
            .unwrap();
        assert_eq!(results[0].chunk.id, "c1");
        assert_eq!(results[1].chunk.id, "c2");
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let index = PolicyIndex::new(4);
        let result = index.insert_batch(vec![chunk("c1", ChunkKind::General, 0, vec![1.0, 0.0])]);
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn clear_empties_the_index() {
        let index = PolicyIndex::new(4);
        index
            .insert_batch(vec![chunk("c1", ChunkKind::General, 0, vec![1.0, 0.0, 0.0, 0.0])])
            .unwrap();
        index.clear();
        assert!(index.is_empty());
        assert!(index.similar(&[1.0, 0.0, 0.0, 0.0], 10, &KindFilter::any()).unwrap().is_empty());
    }

    #[test]
    fn load_round_trips_chunks() {
        let index = PolicyIndex::new(4);
        let chunks = vec![
            chunk("c1", ChunkKind::General, 0, vec![1.0, 0.0, 0.0, 0.0]),
            chunk("c2", ChunkKind::General, 1, vec![0.0, 1.0, 0.0, 0.0]),
        ];
        index.load(chunks).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.get("c1").is_some());
    }
}
