//! Bounded ingestion queue with a single consumer.
//!
//! Uploads become jobs on one bounded channel. One worker task drains it, so batches never
//! interleave their registry writes. Every job publishes its progress through its own `watch`
//! channel; the queue keeps the receivers of recent jobs so status requests can find them by id.
//! File names stay pending from submission until their job is done, so uploads can tell a file
//! that is already on its way from a new one.

use crate::extract::file_name_of;
use crate::processing::service::ProcessingService;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tracing::Instrument;
use uuid::Uuid;

const MAX_TRACKED_JOBS: usize = 256;

/// Errors returned when submitting a job.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    /// Queue is at capacity.
    #[error("ingestion queue is full")]
    QueueFull,
    /// Worker has stopped.
    #[error("ingestion queue is closed")]
    Closed,
}

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// No job has been submitted yet.
    #[default]
    Idle,
    /// Waiting for the worker.
    Queued,
    /// Files are being ingested.
    Running,
    /// Every file was attempted.
    Finished,
}

/// Progress of one ingestion job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    /// Job identifier; `None` for the idle placeholder.
    pub job_id: Option<Uuid>,
    /// Lifecycle state.
    pub state: JobState,
    /// Files in the batch.
    pub total: usize,
    /// Files attempted so far.
    pub current: usize,
    /// Whether the worker is on this job.
    pub processing: bool,
    /// Most recent per-file error, if any.
    pub error: Option<String>,
    /// RFC 3339 time the worker picked the job up.
    pub started_at: Option<String>,
    /// RFC 3339 time the last file was attempted.
    pub finished_at: Option<String>,
}

/// Handle returned to the submitter of a job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// Job identifier.
    pub id: Uuid,
    /// Live progress.
    pub status: watch::Receiver<JobStatus>,
}

struct Job {
    id: Uuid,
    paths: Vec<PathBuf>,
    file_names: Vec<String>,
    status: watch::Sender<JobStatus>,
}

#[derive(Default)]
struct JobTable {
    order: VecDeque<Uuid>,
    receivers: HashMap<Uuid, watch::Receiver<JobStatus>>,
    /// Queued or running file names, counted per job that carries them.
    pending: HashMap<String, usize>,
}

impl JobTable {
    fn insert(&mut self, id: Uuid, receiver: watch::Receiver<JobStatus>) {
        self.order.push_back(id);
        self.receivers.insert(id, receiver);
        while self.order.len() > MAX_TRACKED_JOBS {
            if let Some(evicted) = self.order.pop_front() {
                self.receivers.remove(&evicted);
            }
        }
    }

    fn hold(&mut self, file_names: &[String]) {
        for name in file_names {
            *self.pending.entry(name.clone()).or_default() += 1;
        }
    }

    fn release(&mut self, file_names: &[String]) {
        for name in file_names {
            if let Some(count) = self.pending.get_mut(name) {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(name);
                }
            }
        }
    }
}

fn lock_table(jobs: &Mutex<JobTable>) -> MutexGuard<'_, JobTable> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Submission side of the ingestion queue.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    jobs: Arc<Mutex<JobTable>>,
}

impl JobQueue {
    /// Start the worker task and return the submission handle.
    ///
    /// The worker stops once every clone of the queue has been dropped and the backlog drained.
    pub fn spawn(service: Arc<ProcessingService>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Job>(capacity.max(1));
        let jobs = Arc::new(Mutex::new(JobTable::default()));

        let table = jobs.clone();
        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let span = tracing::info_span!("job", job_id = %job.id, files = job.paths.len());
                async {
                    tracing::info!("Job started");
                    let outcomes = service.process_documents(job.paths, &job.status).await;
                    lock_table(&table).release(&job.file_names);
                    let failed = job.status.borrow().error.is_some();
                    tracing::info!(ingested = outcomes.len(), failed, "Job finished");
                }
                .instrument(span)
                .await;
            }
            tracing::debug!("Job worker stopped");
        });

        Self { sender, jobs }
    }

    /// Enqueue a batch of files.
    pub fn submit(&self, paths: Vec<PathBuf>) -> Result<JobHandle, JobError> {
        let id = Uuid::new_v4();
        let (status, receiver) = watch::channel(JobStatus {
            job_id: Some(id),
            state: JobState::Queued,
            total: paths.len(),
            ..JobStatus::default()
        });
        let files = paths.len();
        let file_names: Vec<String> = paths.iter().map(|path| file_name_of(path)).collect();

        // Names are held before the send; only the worker or a failed send releases them.
        self.table().hold(&file_names);
        let job = Job {
            id,
            paths,
            file_names: file_names.clone(),
            status,
        };
        if let Err(error) = self.sender.try_send(job) {
            self.table().release(&file_names);
            return Err(match error {
                mpsc::error::TrySendError::Full(_) => JobError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => JobError::Closed,
            });
        }

        self.table().insert(id, receiver.clone());
        tracing::info!(job_id = %id, files, "Job queued");
        Ok(JobHandle {
            id,
            status: receiver,
        })
    }

    /// Status of the job with `id`, if it is still tracked.
    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.table()
            .receivers
            .get(&id)
            .map(|receiver| receiver.borrow().clone())
    }

    /// Status of the newest job, or the idle placeholder.
    pub fn latest(&self) -> JobStatus {
        let table = self.table();
        table
            .order
            .back()
            .and_then(|id| table.receivers.get(id))
            .map(|receiver| receiver.borrow().clone())
            .unwrap_or_default()
    }

    /// Whether `file_name` belongs to a job that is queued or running.
    pub fn is_pending(&self, file_name: &str) -> bool {
        self.table().pending.contains_key(file_name)
    }

    fn table(&self) -> MutexGuard<'_, JobTable> {
        lock_table(&self.jobs)
    }
}

/// Current UTC time in RFC 3339.
pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
