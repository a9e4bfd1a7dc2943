//! Qdrant vector store integration.

pub mod client;
mod index;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use payload::compute_content_hash;
pub use types::{QdrantError, ScoredPoint};
