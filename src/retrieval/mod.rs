//! Retrieval helpers: diversity re-ranking and answer prompt composition.

pub mod mmr;
pub mod prompt;

pub use mmr::{cosine_similarity, maximal_marginal_relevance};
pub use prompt::{NO_CONTEXT_ANSWER, build_answer_prompt};

/// Retrieval parameters applied to every question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Segments handed to the answer prompt.
    pub k: usize,
    /// Nearest summaries fetched before re-ranking.
    pub fetch_k: usize,
    /// Relevance weight in `[0, 1]`; lower values favour diversity.
    pub lambda: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: 5,
            fetch_k: 15,
            lambda: 0.5,
        }
    }
}

impl SearchOptions {
    /// Options derived from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            k: config.search_k,
            fetch_k: config.search_fetch_k,
            lambda: config.search_lambda_mult,
        }
    }
}
