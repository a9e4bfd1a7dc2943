//! Surface-facing facade over the service and its job queue.

use crate::{
    metrics::MetricsSnapshot,
    processing::{
        jobs::{JobError, JobQueue, JobStatus},
        registry::FileRecord,
        service::ProcessingService,
        types::{Answer, ForgetOutcome, QueryError},
    },
    store::StoreError,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Abstraction over the pipeline used by external surfaces (HTTP, CLI preload).
#[async_trait]
pub trait ProcessingApi: Send + Sync {
    /// Queue files for ingestion, returning the job id.
    fn submit(&self, paths: Vec<PathBuf>) -> Result<Uuid, JobError>;

    /// Status of a specific job, or of the latest one when `job_id` is `None`.
    fn job_status(&self, job_id: Option<Uuid>) -> Option<JobStatus>;

    /// Whether the file already has indexed segments.
    async fn is_registered(&self, file_name: &str) -> bool;

    /// Whether the file is part of a queued or running job.
    fn is_pending(&self, file_name: &str) -> bool;

    /// Remove files from both stores and the registry.
    async fn forget(&self, file_names: Vec<String>) -> ForgetOutcome;

    /// Empty both stores and the registry.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Answer a question from indexed content.
    async fn query(&self, question: &str) -> Result<Answer, QueryError>;

    /// Copy of the file registry.
    async fn registry(&self) -> BTreeMap<String, FileRecord>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Production [`ProcessingApi`]: a shared service plus the queue feeding it.
#[derive(Clone)]
pub struct Pipeline {
    service: Arc<ProcessingService>,
    jobs: JobQueue,
}

impl Pipeline {
    /// Spawn the job worker for `service`.
    pub fn start(service: Arc<ProcessingService>, queue_capacity: usize) -> Self {
        let jobs = JobQueue::spawn(service.clone(), queue_capacity);
        Self { service, jobs }
    }

    /// Shared service handle.
    pub fn service(&self) -> &Arc<ProcessingService> {
        &self.service
    }

    /// Queue handle, for callers that want live progress.
    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }
}

#[async_trait]
impl ProcessingApi for Pipeline {
    fn submit(&self, paths: Vec<PathBuf>) -> Result<Uuid, JobError> {
        self.jobs.submit(paths).map(|handle| handle.id)
    }

    fn job_status(&self, job_id: Option<Uuid>) -> Option<JobStatus> {
        match job_id {
            Some(id) => self.jobs.status(id),
            None => Some(self.jobs.latest()),
        }
    }

    async fn is_registered(&self, file_name: &str) -> bool {
        self.service.is_registered(file_name).await
    }

    fn is_pending(&self, file_name: &str) -> bool {
        self.jobs.is_pending(file_name)
    }

    async fn forget(&self, file_names: Vec<String>) -> ForgetOutcome {
        self.service.forget_files(&file_names).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.service.clear().await
    }

    async fn query(&self, question: &str) -> Result<Answer, QueryError> {
        self.service.query(question).await
    }

    async fn registry(&self) -> BTreeMap<String, FileRecord> {
        self.service.registry_snapshot().await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.service.metrics_snapshot()
    }
}
