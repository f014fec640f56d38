//! The policy-isolated chunk store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use guardrail_core::domain::{Chunk, ChunkDraft, ChunkId, PolicyId};

use crate::error::{Result, StoreError};
use crate::index::PolicyIndex;
use crate::persistence::Persistence;
use crate::types::{KindFilter, ScoredChunk};

struct PolicyState {
    index: Arc<PolicyIndex>,
    /// Held for the duration of one `put_batch` call. A second concurrent
    /// ingestion attempt against the same policy observes this lock already
    /// taken and fails fast with [`StoreError::Conflict`] rather than
    /// queuing behind it.
    ingest_lock: Arc<AsyncMutex<()>>,
}

/// A policy-isolated, HNSW-retrievable, `redb`-persisted store of policy
/// chunks.
///
/// Every chunk is scoped to exactly one `policy_id`; there is one
/// [`PolicyIndex`] per policy, so retrieval can never surface a chunk from
/// a policy other than the one queried — this is a structural property of
/// the store's layout, not a filter that a call site could omit.
pub struct ChunkStore<P: Persistence> {
    dimension: usize,
    persistence: P,
    policies: RwLock<HashMap<PolicyId, PolicyState>>,
    /// Reverse lookup used by [`ChunkStore::fetch`], which only has a
    /// `ChunkId` to go on.
    chunk_to_policy: RwLock<HashMap<ChunkId, PolicyId>>,
}

impl<P: Persistence> std::fmt::Debug for ChunkStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("dimension", &self.dimension)
            .field("policies", &self.policies.read().len())
            .finish_non_exhaustive()
    }
}

impl<P: Persistence> ChunkStore<P> {
    /// Creates an empty store over the given persistence backend and
    /// embedding dimension. No persisted policies are loaded eagerly; each
    /// is loaded lazily the first time it is touched.
    #[must_use]
    pub fn new(dimension: usize, persistence: P) -> Self {
        Self {
            dimension,
            persistence,
            policies: RwLock::new(HashMap::new()),
            chunk_to_policy: RwLock::new(HashMap::new()),
        }
    }

    fn policy_state(&self, policy_id: &PolicyId) -> Result<Arc<PolicyIndex>> {
        if let Some(state) = self.policies.read().get(policy_id) {
            return Ok(Arc::clone(&state.index));
        }

        let index = Arc::new(PolicyIndex::new(self.dimension));
        let persisted = self.persistence.load_policy(policy_id)?;
        if !persisted.is_empty() {
            index.load(persisted.clone())?;
            let mut reverse = self.chunk_to_policy.write();
            for chunk in &persisted {
                reverse.insert(chunk.id.clone(), policy_id.clone());
            }
        }

        let mut policies = self.policies.write();
        let entry = policies.entry(policy_id.clone()).or_insert_with(|| PolicyState {
            index: Arc::clone(&index),
            ingest_lock: Arc::new(AsyncMutex::new(())),
        });
        Ok(Arc::clone(&entry.index))
    }

    fn ingest_lock(&self, policy_id: &PolicyId) -> Arc<AsyncMutex<()>> {
        if let Some(state) = self.policies.read().get(policy_id) {
            return Arc::clone(&state.ingest_lock);
        }
        let mut policies = self.policies.write();
        let entry = policies.entry(policy_id.clone()).or_insert_with(|| PolicyState {
            index: Arc::new(PolicyIndex::new(self.dimension)),
            ingest_lock: Arc::new(AsyncMutex::new(())),
        });
        Arc::clone(&entry.ingest_lock)
    }

    /// Inserts a batch of chunk drafts for one policy, atomically, and
    /// returns the assigned ids in input order.
    ///
    /// Rejects with [`StoreError::Conflict`] if an ingestion for the same
    /// `policy_id` is already in flight, rather than queuing behind it —
    /// a caller always knows immediately whether its request is running.
    ///
    /// All-or-nothing: a dimension mismatch on any draft leaves the
    /// policy's existing chunks untouched.
    pub async fn put_batch(&self, policy_id: &PolicyId, drafts: Vec<ChunkDraft>) -> Result<Vec<ChunkId>> {
        let lock = self.ingest_lock(policy_id);
        let Ok(_guard) = lock.try_lock() else {
            return Err(StoreError::Conflict(policy_id.clone()));
        };

        let index = self.policy_state(policy_id)?;
        let existing_count = index.len() as u32;

        let now = chrono::Utc::now();
        let mut ids = Vec::with_capacity(drafts.len());
        let mut chunks = Vec::with_capacity(drafts.len());
        for (offset, draft) in drafts.into_iter().enumerate() {
            if draft.embedding.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: draft.embedding.len(),
                });
            }
            let id = assign_chunk_id(policy_id, existing_count + offset as u32);
            ids.push(id.clone());
            chunks.push(Chunk {
                id,
                policy_id: draft.policy_id,
                text: draft.text,
                kind: draft.kind,
                page_number: draft.page_number,
                section_title: draft.section_title,
                position: existing_count + offset as u32,
                embedding: draft.embedding,
                created_at: now,
            });
        }

        index.insert_batch(chunks.clone())?;

        {
            let mut reverse = self.chunk_to_policy.write();
            for chunk in &chunks {
                reverse.insert(chunk.id.clone(), policy_id.clone());
            }
        }

        self.persistence.save_policy(policy_id, &index.snapshot())?;

        Ok(ids)
    }

    /// Removes every chunk belonging to `policy_id`, in-memory and
    /// persisted, atomically.
    pub fn delete_policy(&self, policy_id: &PolicyId) -> Result<()> {
        let removed = if let Some(state) = self.policies.read().get(policy_id) {
            let count = state.index.len();
            state.index.clear();
            count
        } else {
            0
        };

        self.persistence.delete_policy(policy_id)?;

        let mut reverse = self.chunk_to_policy.write();
        reverse.retain(|_, p| p != policy_id);

        tracing::info!(policy_id = %policy_id, chunks_removed = removed, "deleted policy");
        Ok(())
    }

    /// Top-`k` chunks for `policy_id` similar to `query`, restricted to
    /// `kind_filter`. `policy_id` is a hard pre-filter: chunks from other
    /// policies are never loaded into the search in the first place.
    pub fn similar(
        &self,
        policy_id: &PolicyId,
        query: &[f32],
        k: usize,
        kind_filter: &KindFilter,
    ) -> Result<Vec<ScoredChunk>> {
        let index = self.policy_state(policy_id)?;
        index.similar(query, k, kind_filter)
    }

    /// Fetches one chunk by id, regardless of which policy it belongs to.
    pub fn fetch(&self, chunk_id: &ChunkId) -> Result<Chunk> {
        let policy_id = self
            .chunk_to_policy
            .read()
            .get(chunk_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(chunk_id.clone()))?;
        let index = self.policy_state(&policy_id)?;
        index.get(chunk_id).ok_or_else(|| StoreError::NotFound(chunk_id.clone()))
    }

    /// Number of chunks for `policy_id` matching `kind_filter`.
    pub fn count(&self, policy_id: &PolicyId, kind_filter: &KindFilter) -> Result<usize> {
        let index = self.policy_state(policy_id)?;
        Ok(index.count(kind_filter))
    }

    /// The embedding dimension this store was constructed with.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic, collision-free chunk id: the policy id and position are
/// already unique together, so there is no need for a random id generator
/// (and no need for the `uuid` dependency) here.
fn assign_chunk_id(policy_id: &PolicyId, position: u32) -> ChunkId {
    format!("{policy_id}#chunk-{position}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardrail_core::domain::ChunkKind;
    use tempfile::tempdir;

    use crate::persistence::RedbPersistence;

    fn draft(policy_id: &str, text: &str, kind: ChunkKind, embedding: Vec<f32>) -> ChunkDraft {
        ChunkDraft {
            policy_id: policy_id.to_string(),
            text: text.to_string(),
            kind,
            page_number: 1,
            section_title: None,
            embedding,
        }
    }

    fn store() -> (tempfile::TempDir, ChunkStore<RedbPersistence>) {
        let dir = tempdir().unwrap();
        let persistence = RedbPersistence::new(dir.path().join("test.redb")).unwrap();
        (dir, ChunkStore::new(4, persistence))
    }

    #[tokio::test]
    async fn put_batch_assigns_ids_in_order() {
        let (_dir, store) = store();
        let ids = store
            .put_batch(
                &"policy-1".to_string(),
                vec![
                    draft("policy-1", "first", ChunkKind::General, vec![1.0, 0.0, 0.0, 0.0]),
                    draft("policy-1", "second", ChunkKind::General, vec![0.0, 1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn policies_are_isolated() {
        let (_dir, store) = store();
        store
            .put_batch(
                &"policy-a".to_string(),
                vec![draft("policy-a", "alpha", ChunkKind::General, vec![1.0, 0.0, 0.0, 0.0])],
            )
            .await
            .unwrap();
        store
            .put_batch(
                &"policy-b".to_string(),
                vec![draft("policy-b", "beta", ChunkKind::General, vec![1.0, 0.0, 0.0, 0.0])],
            )
            .await
            .unwrap();

        let results = store
            .similar(&"policy-a".to_string(), &[1.0, 0.0, 0.0, 0.0], 10, &KindFilter::any())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.policy_id, "policy-a");
    }

    #[tokio::test]
    async fn delete_policy_then_similar_is_empty() {
        let (_dir, store) = store();
        let policy_id = "policy-1".to_string();
        store
            .put_batch(&policy_id, vec![draft("policy-1", "alpha", ChunkKind::General, vec![1.0, 0.0, 0.0, 0.0])])
            .await
            .unwrap();

        store.delete_policy(&policy_id).unwrap();

        let results = store.similar(&policy_id, &[1.0, 0.0, 0.0, 0.0], 10, &KindFilter::any()).unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let (_dir, store) = store();
        let result = store
            .put_batch(&"policy-1".to_string(), vec![draft("policy-1", "alpha", ChunkKind::General, vec![1.0, 0.0])])
            .await;
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn fetch_returns_not_found_for_unknown_id() {
        let (_dir, store) = store();
        let result = store.fetch(&"missing".to_string());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_and_reload_round_trips_chunks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");
        let policy_id = "policy-1".to_string();

        {
            let persistence = RedbPersistence::new(&path).unwrap();
            let store = ChunkStore::new(4, persistence);
            store
                .put_batch(&policy_id, vec![draft("policy-1", "alpha", ChunkKind::General, vec![1.0, 0.0, 0.0, 0.0])])
                .await
                .unwrap();
        }

        let persistence = RedbPersistence::new(&path).unwrap();
        let store = ChunkStore::new(4, persistence);
        assert_eq!(store.count(&policy_id, &KindFilter::any()).unwrap(), 1);
    }
}
