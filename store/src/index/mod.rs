//! Per-policy vector indexing.
//!
//! Each policy gets its own [`PolicyIndex`]: an `instant-distance` HNSW
//! graph plus the bookkeeping needed to enforce kind-filtered queries as a
//! hard pre-filter. One graph per policy, rather than one shared graph with
//! a `policy_id` filter, is what makes cross-policy leakage impossible to
//! introduce at a call site — there is no shared structure to leak from.

mod hnsw;

pub use hnsw::PolicyIndex;
