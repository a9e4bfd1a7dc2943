//! Core data types and error definitions for the processing pipeline.

use crate::{
    chat::ChatClientError, embedding::EmbeddingClientError, extract::ExtractionError,
    extract::SourceKind, store::StoreError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors emitted while ingesting a single file.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// File extension is not on the allow-list.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// Extraction adapter failed to read the file.
    #[error("Failed to extract document: {0}")]
    Extraction(#[from] ExtractionError),
    /// A summarization call failed; the whole file is abandoned.
    #[error("Failed to summarize segment: {0}")]
    Summarization(#[source] ChatClientError),
    /// Embedding provider failed to produce vectors for the summaries.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index or document store write failed.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),
    /// Embedding provider returned a different number of vectors than requested.
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    EmbeddingCountMismatch {
        /// Number of summaries sent.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
}

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding provider failed to return a vector for the question.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index or document store lookup failed.
    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),
    /// Answer model call failed.
    #[error("Failed to generate answer: {0}")]
    Chat(#[from] ChatClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
}

/// Summary of one ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Base name of the file.
    pub file_name: String,
    /// Extraction type used.
    pub kind: SourceKind,
    /// Segments produced by extraction.
    pub segments: usize,
    /// Segments summarized and written to both stores.
    pub indexed: usize,
    /// Segments whose identifier was already indexed.
    pub skipped_existing: usize,
}

/// Result of a deletion request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForgetOutcome {
    /// Files whose entries were removed from both stores.
    pub forgotten: Vec<String>,
    /// Files that stayed registered because a store deletion failed, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Answer to a question with the provenance of its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// Model answer, or the fixed no-context answer.
    pub answer: String,
    /// Page of each context segment, parallel to `file_name`.
    pub page_number: Vec<Option<u32>>,
    /// File of each context segment, in context order.
    pub file_name: Vec<String>,
}
