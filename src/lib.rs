#![deny(missing_docs)]

//! Core library for the docqa document question-answering server.

/// HTTP routing and REST handlers.
pub mod api;
/// Chat-completion clients for summaries and answers.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// File extraction and chunking.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query metrics helpers.
pub mod metrics;
/// Document processing pipeline and job queue.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Maximal marginal relevance and answer prompts.
pub mod retrieval;
/// Vector index and document store seams.
pub mod store;
