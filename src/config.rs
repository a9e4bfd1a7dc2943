//! Environment-driven configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env` file, and are
//! validated once at startup before being cached in [`CONFIG`].

use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docqa server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Backend used for the summary vector index.
    pub vector_store: VectorStoreBackend,
    /// Base URL of the Qdrant instance, required for the Qdrant backend.
    pub qdrant_url: Option<String>,
    /// Name of the Qdrant collection holding summary vectors.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime (embeddings and chat).
    pub ollama_url: String,
    /// Chat model provider used for summaries and answers.
    pub chat_provider: ChatProvider,
    /// Chat model identifier.
    pub chat_model: String,
    /// API key for the Groq chat endpoint.
    pub groq_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible Groq API.
    pub groq_base_url: String,
    /// Hard upper bound on characters per chunk.
    pub chunk_max_characters: usize,
    /// Soft bound after which a chunk is closed.
    pub chunk_new_after_characters: usize,
    /// Chunks shorter than this absorb the following section.
    pub chunk_combine_under_characters: usize,
    /// Characters carried over from the previous chunk.
    pub chunk_overlap: usize,
    /// Maximum summarization calls in flight per file.
    pub summary_concurrency: usize,
    /// Number of segments handed to the answer prompt.
    pub search_k: usize,
    /// Number of nearest summaries fetched before diversity selection.
    pub search_fetch_k: usize,
    /// Relevance/diversity trade-off for maximal marginal relevance.
    pub search_lambda_mult: f32,
    /// Path or name of the tesseract executable.
    pub tesseract_path: String,
    /// Language pack passed to tesseract.
    pub ocr_language: String,
    /// Directory receiving uploaded files.
    pub upload_dir: String,
    /// Maximum accepted upload request size in megabytes.
    pub max_upload_mb: usize,
    /// Number of ingestion jobs that may wait in the queue.
    pub job_queue_capacity: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported vector index backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreBackend {
    /// Remote Qdrant collection.
    Qdrant,
    /// Process-local brute-force index.
    Memory,
}

/// Supported embedding backends for the processing pipeline.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic byte-hash embeddings, no network.
    Hashing,
}

/// Supported chat-completion backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted Groq API (OpenAI-compatible).
    Groq,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vector_store: VectorStoreBackend::Qdrant,
            qdrant_url: None,
            qdrant_collection_name: "storage_vector".into(),
            qdrant_api_key: None,
            embedding_provider: EmbeddingProvider::Ollama,
            embedding_model: "nomic-embed-text".into(),
            embedding_dimension: 768,
            ollama_url: "http://127.0.0.1:11434".into(),
            chat_provider: ChatProvider::Ollama,
            chat_model: "llama3.1".into(),
            groq_api_key: None,
            groq_base_url: "https://api.groq.com/openai/v1".into(),
            chunk_max_characters: 10_000,
            chunk_new_after_characters: 6_000,
            chunk_combine_under_characters: 2_000,
            chunk_overlap: 0,
            summary_concurrency: 3,
            search_k: 5,
            search_fetch_k: 15,
            search_lambda_mult: 0.5,
            tesseract_path: "tesseract".into(),
            ocr_language: "eng".into(),
            upload_dir: "uploads".into(),
            max_upload_mb: 25,
            job_queue_capacity: 16,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            vector_store: parse_or("VECTOR_STORE", defaults.vector_store)?,
            qdrant_url: load_env_optional("QDRANT_URL"),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or(defaults.qdrant_collection_name),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: parse_or("EMBEDDING_PROVIDER", defaults.embedding_provider)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            chat_provider: parse_or("CHAT_PROVIDER", defaults.chat_provider)?,
            chat_model: load_env_optional("CHAT_MODEL").unwrap_or(defaults.chat_model),
            groq_api_key: load_env_optional("GROQ_API_KEY"),
            groq_base_url: load_env_optional("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
            chunk_max_characters: parse_or("CHUNK_MAX_CHARACTERS", defaults.chunk_max_characters)?,
            chunk_new_after_characters: parse_or(
                "CHUNK_NEW_AFTER_CHARACTERS",
                defaults.chunk_new_after_characters,
            )?,
            chunk_combine_under_characters: parse_or(
                "CHUNK_COMBINE_UNDER_CHARACTERS",
                defaults.chunk_combine_under_characters,
            )?,
            chunk_overlap: parse_or("TEXT_SPLITTER_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            summary_concurrency: parse_or("SUMMARY_CONCURRENCY", defaults.summary_concurrency)?,
            search_k: parse_or("SEARCH_K", defaults.search_k)?,
            search_fetch_k: parse_or("SEARCH_FETCH_K", defaults.search_fetch_k)?,
            search_lambda_mult: parse_or("SEARCH_LAMBDA_MULT", defaults.search_lambda_mult)?,
            tesseract_path: load_env_optional("TESSERACT_PATH").unwrap_or(defaults.tesseract_path),
            ocr_language: load_env_optional("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            upload_dir: load_env_optional("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            max_upload_mb: parse_or("MAX_UPLOAD_MB", defaults.max_upload_mb)?,
            job_queue_capacity: parse_or("JOB_QUEUE_CAPACITY", defaults.job_queue_capacity)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that individual parsers cannot see.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_store == VectorStoreBackend::Qdrant && self.qdrant_url.is_none() {
            return Err(ConfigError::MissingVariable("QDRANT_URL".into()));
        }
        if self.chat_provider == ChatProvider::Groq && self.groq_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GROQ_API_KEY".into()));
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.chunk_max_characters == 0
            || self.chunk_new_after_characters > self.chunk_max_characters
        {
            return Err(ConfigError::InvalidValue("CHUNK_NEW_AFTER_CHARACTERS".into()));
        }
        if self.summary_concurrency == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CONCURRENCY".into()));
        }
        if self.search_k == 0 || self.search_fetch_k < self.search_k {
            return Err(ConfigError::InvalidValue("SEARCH_FETCH_K".into()));
        }
        if !(0.0..=1.0).contains(&self.search_lambda_mult) {
            return Err(ConfigError::InvalidValue("SEARCH_LAMBDA_MULT".into()));
        }
        if self.job_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("JOB_QUEUE_CAPACITY".into()));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for VectorStoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for ChatProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "groq" => Ok(Self::Groq),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        vector_store = ?config.vector_store,
        qdrant_url = ?config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        chat_provider = ?config.chat_provider,
        chat_model = %config.chat_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
