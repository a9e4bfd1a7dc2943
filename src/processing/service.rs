//! Processing service coordinating extraction, summarization, indexing and answering.

use crate::{
    chat::{ChatClient, ChatRequest, get_chat_client},
    config::{Config, VectorStoreBackend},
    embedding::{EmbeddingClient, get_embedding_client},
    extract::{ChunkingOptions, Extractors, Segment, SourceKind, TesseractCli, file_name_of},
    metrics::{IngestMetrics, MetricsSnapshot},
    processing::{
        chunk_id::{assign_chunk_ids, point_id},
        jobs::{JobState, JobStatus, now_rfc3339},
        registry::{FileRecord, FileRegistry},
        summarize::summarize_segments,
        types::{Answer, FileOutcome, ForgetOutcome, ProcessingError, QueryError},
    },
    qdrant::{QdrantError, QdrantService},
    retrieval::{NO_CONTEXT_ANSWER, SearchOptions, build_answer_prompt, maximal_marginal_relevance},
    store::{
        DocumentStore, MemoryDocumentStore, MemoryVectorIndex, StoreError, SummaryPoint,
        SummaryRecord, VectorIndex,
    },
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, watch};

/// Errors raised while building the service at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Embedding client could not be constructed.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] crate::embedding::EmbeddingClientError),
    /// Chat client could not be constructed.
    #[error("Failed to initialize chat client: {0}")]
    Chat(#[from] crate::chat::ChatClientError),
    /// Qdrant client could not be constructed.
    #[error("Failed to initialize Qdrant client: {0}")]
    Qdrant(#[from] QdrantError),
    /// Vector index could not be prepared.
    #[error("Failed to prepare vector index: {0}")]
    Store(#[from] StoreError),
}

/// Pipeline settings that are fixed for the lifetime of the service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Chat model used for summaries and answers.
    pub chat_model: String,
    /// Summarization calls in flight per file.
    pub summary_concurrency: usize,
    /// Retrieval parameters.
    pub search: SearchOptions,
}

impl ServiceSettings {
    /// Settings derived from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chat_model: config.chat_model.clone(),
            summary_concurrency: config.summary_concurrency,
            search: SearchOptions::from_config(config),
        }
    }
}

/// Backends the service is assembled from.
pub struct ServiceComponents {
    /// Embeds summaries and questions.
    pub embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    /// Writes summaries and answers.
    pub chat_client: Box<dyn ChatClient>,
    /// Holds embedded summaries.
    pub vector_index: Arc<dyn VectorIndex>,
    /// Holds raw segments.
    pub documents: Arc<dyn DocumentStore>,
    /// Extraction adapters.
    pub extractors: Extractors,
    /// Pipeline settings.
    pub settings: ServiceSettings,
}

/// Coordinates ingestion, deletion, clearing and question answering.
///
/// The service owns long-lived handles to the model clients, both stores and the file registry
/// so that the job worker and the HTTP handlers share the same state. Construct it once near
/// process start and share it through an `Arc`.
pub struct ProcessingService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    chat_client: Box<dyn ChatClient>,
    vector_index: Arc<dyn VectorIndex>,
    documents: Arc<dyn DocumentStore>,
    registry: RwLock<FileRegistry>,
    /// Serializes store mutations (ingest, forget, clear) so the registry always matches both
    /// stores. Taken before the registry lock.
    mutation: Mutex<()>,
    extractors: Extractors,
    metrics: Arc<IngestMetrics>,
    settings: ServiceSettings,
}

impl ProcessingService {
    /// Build the service from configuration and reset the vector index.
    ///
    /// The document store is process-local, so any summaries left in a persistent index by a
    /// previous run would point at nothing; the index is emptied before serving.
    pub async fn new(config: &Config) -> Result<Self, StartupError> {
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedding_client = get_embedding_client(config)?;
        tracing::info!(provider = ?config.chat_provider, model = %config.chat_model, "Initializing chat client");
        let chat_client = get_chat_client(config)?;

        let vector_index: Arc<dyn VectorIndex> = match config.vector_store {
            VectorStoreBackend::Qdrant => Arc::new(QdrantService::from_config(config)?),
            VectorStoreBackend::Memory => Arc::new(MemoryVectorIndex::new()),
        };
        let ocr = Arc::new(TesseractCli::new(
            config.tesseract_path.clone(),
            config.ocr_language.clone(),
        ));

        let service = Self::with_components(ServiceComponents {
            embedding_client,
            chat_client,
            vector_index,
            documents: Arc::new(MemoryDocumentStore::new()),
            extractors: Extractors::new(ChunkingOptions::from_config(config), ocr),
            settings: ServiceSettings::from_config(config),
        });
        service.prepare().await?;
        Ok(service)
    }

    /// Assemble a service from explicit backends without touching them.
    pub fn with_components(components: ServiceComponents) -> Self {
        Self {
            embedding_client: components.embedding_client,
            chat_client: components.chat_client,
            vector_index: components.vector_index,
            documents: components.documents,
            registry: RwLock::new(FileRegistry::new()),
            mutation: Mutex::new(()),
            extractors: components.extractors,
            metrics: Arc::new(IngestMetrics::new()),
            settings: components.settings,
        }
    }

    /// Make the vector index available and empty.
    pub async fn prepare(&self) -> Result<(), StoreError> {
        self.vector_index.ensure_ready().await?;
        self.vector_index.reset().await?;
        tracing::info!("Vector index ready");
        Ok(())
    }

    /// Extract, summarize and index one file.
    ///
    /// Segments whose identifier is already in the vector index are skipped entirely, so
    /// re-ingesting an unchanged file performs no model calls and no writes. Extraction runs
    /// unlocked; from the identifier lookup until the registry record, a concurrent forget or
    /// clear waits.
    pub async fn ingest_file(&self, path: &Path) -> Result<FileOutcome, ProcessingError> {
        let file_name = file_name_of(path);
        let kind = SourceKind::from_path(path)
            .ok_or_else(|| ProcessingError::UnsupportedFileType(file_name.clone()))?;
        tracing::info!(file = %file_name, kind = %kind, "Ingesting file");

        let segments = self.extractors.extract(path, kind).await?;
        let total = segments.len();
        if segments.is_empty() {
            tracing::info!(file = %file_name, kind = %kind, "No segments extracted");
            return Ok(FileOutcome {
                file_name,
                kind,
                segments: 0,
                indexed: 0,
                skipped_existing: 0,
            });
        }

        let chunk_ids = assign_chunk_ids(&segments);
        let point_ids: Vec<String> = chunk_ids
            .iter()
            .map(|chunk_id| point_id(chunk_id).to_string())
            .collect();

        let _mutation = self.mutation.lock().await;
        let existing = self.vector_index.existing_ids(&point_ids).await?;

        let mut fresh_ids = Vec::new();
        let mut fresh_chunk_ids = Vec::new();
        let mut fresh_segments = Vec::new();
        for ((segment, chunk_id), id) in segments.into_iter().zip(chunk_ids).zip(&point_ids) {
            if !existing.contains(id) {
                fresh_ids.push(id.clone());
                fresh_chunk_ids.push(chunk_id);
                fresh_segments.push(segment);
            }
        }
        let skipped_existing = total - fresh_segments.len();

        if !fresh_segments.is_empty() {
            self.index_segments(kind, &fresh_ids, fresh_chunk_ids, fresh_segments)
                .await?;
        }

        self.registry
            .write()
            .await
            .record(&file_name, kind, point_ids);

        let indexed = total - skipped_existing;
        self.metrics
            .record_document(indexed as u64, skipped_existing as u64);
        tracing::info!(
            file = %file_name,
            kind = %kind,
            segments = total,
            indexed,
            skipped_existing,
            "File indexed"
        );

        Ok(FileOutcome {
            file_name,
            kind,
            segments: total,
            indexed,
            skipped_existing,
        })
    }

    async fn index_segments(
        &self,
        kind: SourceKind,
        ids: &[String],
        chunk_ids: Vec<String>,
        segments: Vec<Segment>,
    ) -> Result<(), ProcessingError> {
        let summaries = summarize_segments(
            self.chat_client.as_ref(),
            &self.settings.chat_model,
            kind,
            &segments,
            self.settings.summary_concurrency,
        )
        .await?;

        let vectors = self
            .embedding_client
            .generate_embeddings(summaries.clone())
            .await?;
        if vectors.len() != summaries.len() {
            return Err(ProcessingError::EmbeddingCountMismatch {
                expected: summaries.len(),
                actual: vectors.len(),
            });
        }

        let points: Vec<SummaryPoint> = ids
            .iter()
            .zip(chunk_ids)
            .zip(summaries)
            .zip(vectors)
            .zip(&segments)
            .map(|((((id, chunk_id), summary), vector), segment)| SummaryPoint {
                id: id.clone(),
                vector,
                record: SummaryRecord {
                    doc_id: id.clone(),
                    chunk_id,
                    summary,
                    file_name: segment.file_name.clone(),
                    page_number: segment.page_number,
                    kind,
                },
            })
            .collect();

        self.vector_index.upsert(points).await?;
        self.documents
            .put_many(ids.iter().cloned().zip(segments).collect())
            .await?;
        Ok(())
    }

    /// Ingest `paths` one after another, publishing progress through `status`.
    ///
    /// A failing file is logged and recorded as the job error; later files still run.
    pub async fn process_documents(
        &self,
        paths: Vec<PathBuf>,
        status: &watch::Sender<JobStatus>,
    ) -> Vec<FileOutcome> {
        let total = paths.len();
        status.send_modify(|current| {
            current.total = total;
            current.current = 0;
            current.processing = true;
            current.state = JobState::Running;
            current.error = None;
            current.started_at = Some(now_rfc3339());
        });

        let mut outcomes = Vec::with_capacity(total);
        for path in paths {
            match self.ingest_file(&path).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => {
                    let file_name = file_name_of(&path);
                    tracing::error!(file = %file_name, error = %error, "Failed to ingest file");
                    status.send_modify(|current| {
                        current.error = Some(format!("{file_name}: {error}"));
                    });
                }
            }
            status.send_modify(|current| current.current += 1);
        }

        status.send_modify(|current| {
            current.processing = false;
            current.state = JobState::Finished;
            current.finished_at = Some(now_rfc3339());
        });
        outcomes
    }

    /// Remove files from both stores and the registry.
    ///
    /// Unknown names are ignored. A file whose store deletion fails keeps its record so the
    /// request can be retried.
    pub async fn forget_files(&self, names: &[String]) -> ForgetOutcome {
        let _mutation = self.mutation.lock().await;
        let mut outcome = ForgetOutcome::default();
        for name in names {
            let mut registry = self.registry.write().await;
            let Some(record) = registry.get(name).cloned() else {
                tracing::debug!(file = %name, "Forget requested for unknown file");
                continue;
            };

            match self.delete_record(&record).await {
                Ok(()) => {
                    registry.remove(name);
                    tracing::info!(
                        file = %name,
                        kind = %record.kind,
                        segments = record.segment_ids.len(),
                        "File forgotten"
                    );
                    outcome.forgotten.push(name.clone());
                }
                Err(error) => {
                    tracing::error!(file = %name, kind = %record.kind, error = %error, "Failed to forget file");
                    outcome.failed.push((name.clone(), error.to_string()));
                }
            }
        }
        outcome
    }

    async fn delete_record(&self, record: &FileRecord) -> Result<(), StoreError> {
        self.vector_index.delete(&record.segment_ids).await?;
        self.documents.delete_many(&record.segment_ids).await?;
        Ok(())
    }

    /// Reset the vector index, empty the document store and the registry.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _mutation = self.mutation.lock().await;
        let mut registry = self.registry.write().await;
        self.vector_index.reset().await?;
        self.documents.clear().await?;
        let files = registry.len();
        registry.clear();
        tracing::info!(files, "Knowledge base cleared");
        Ok(())
    }

    /// Answer `question` from the indexed documents.
    pub async fn query(&self, question: &str) -> Result<Answer, QueryError> {
        let search = self.settings.search;
        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let query_vector = vectors.pop().ok_or(QueryError::EmptyEmbedding)?;

        let hits = self
            .vector_index
            .search(&query_vector, search.fetch_k)
            .await?;
        let (records, candidates): (Vec<SummaryRecord>, Vec<Vec<f32>>) = hits
            .into_iter()
            .map(|hit| (hit.record, hit.vector))
            .unzip();
        let picks = maximal_marginal_relevance(&query_vector, &candidates, search.k, search.lambda);
        let ids: Vec<String> = picks
            .into_iter()
            .map(|index| records[index].doc_id.clone())
            .collect();

        let context: Vec<Segment> = self
            .documents
            .get_many(&ids)
            .await?
            .into_iter()
            .flatten()
            .collect();
        self.metrics.record_query();
        tracing::info!(
            candidates = candidates.len(),
            selected = ids.len(),
            resolved = context.len(),
            "Context retrieved"
        );

        if context.is_empty() {
            return Ok(Answer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                page_number: Vec::new(),
                file_name: Vec::new(),
            });
        }

        let answer = self
            .chat_client
            .complete(ChatRequest {
                model: self.settings.chat_model.clone(),
                prompt: build_answer_prompt(question, &context),
                temperature: Some(0.0),
            })
            .await?;

        Ok(Answer {
            answer,
            page_number: context.iter().map(|segment| segment.page_number).collect(),
            file_name: context
                .iter()
                .map(|segment| segment.file_name.clone())
                .collect(),
        })
    }

    /// Whether `file_name` has indexed segments.
    pub async fn is_registered(&self, file_name: &str) -> bool {
        self.registry.read().await.get(file_name).is_some()
    }

    /// Copy of the file registry.
    pub async fn registry_snapshot(&self) -> BTreeMap<String, FileRecord> {
        self.registry.read().await.snapshot()
    }

    /// Number of summaries in the vector index.
    pub async fn vector_count(&self) -> Result<usize, StoreError> {
        self.vector_index.count().await
    }

    /// Number of raw segments in the document store.
    pub async fn document_count(&self) -> Result<usize, StoreError> {
        self.documents.len().await
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
