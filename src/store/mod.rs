//! Storage seams for the multi-vector index.
//!
//! Summaries live in a [`VectorIndex`] keyed by point id; the raw segments they describe live in a
//! [`DocumentStore`] under the same id. Nothing here coordinates the two: callers write the index
//! first and the document store second, and delete in the same order.

pub mod docstore;
pub mod memory;

use crate::extract::{Segment, SourceKind};
use crate::qdrant::QdrantError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub use docstore::MemoryDocumentStore;
pub use memory::MemoryVectorIndex;

/// Errors raised by either store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Qdrant request failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Backend-specific failure without a richer type.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Summary of one segment as stored next to its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Shared identifier linking the summary to its raw segment.
    pub doc_id: String,
    /// Positional chunk identifier (`{source_path}:{page}:{ordinal}`).
    pub chunk_id: String,
    /// Model-written summary; this is the embedded text.
    pub summary: String,
    /// File the segment was extracted from.
    pub file_name: String,
    /// Page of the segment, when the source is paged.
    pub page_number: Option<u32>,
    /// Media family of the source file.
    pub kind: SourceKind,
}

/// Vector plus record, ready for insertion.
#[derive(Debug, Clone)]
pub struct SummaryPoint {
    /// Point identifier, equal to `record.doc_id`.
    pub id: String,
    /// Embedding of `record.summary`.
    pub vector: Vec<f32>,
    /// Stored record.
    pub record: SummaryRecord,
}

/// Scored search result.
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Point identifier.
    pub id: String,
    /// Cosine similarity to the query vector.
    pub score: f32,
    /// Stored record.
    pub record: SummaryRecord,
    /// Stored vector, needed for diversity re-ranking.
    pub vector: Vec<f32>,
}

/// Vector index holding embedded summaries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if needed.
    async fn ensure_ready(&self) -> Result<(), StoreError>;

    /// Insert or overwrite points, returning how many were written.
    async fn upsert(&self, points: Vec<SummaryPoint>) -> Result<usize, StoreError>;

    /// Subset of `ids` already present in the index.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError>;

    /// Remove the given points; unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Nearest points to `vector`, best first, vectors included.
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<VectorHit>, StoreError>;

    /// Drop every point and leave an empty, ready index behind.
    async fn reset(&self) -> Result<(), StoreError>;

    /// Number of stored points.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Key-value store of raw segments.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store segments under their ids, overwriting existing entries.
    async fn put_many(&self, entries: Vec<(String, Segment)>) -> Result<(), StoreError>;

    /// Look up segments, preserving the order of `ids`; missing entries are `None`.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Option<Segment>>, StoreError>;

    /// Remove entries; unknown ids are ignored.
    async fn delete_many(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize, StoreError>;
}
