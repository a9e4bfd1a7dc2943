//! Document pipeline: ingestion, deletion, clearing and question answering.

pub mod chunk_id;
pub mod jobs;
mod pipeline;
pub mod registry;
mod service;
pub mod summarize;
pub mod types;

pub use jobs::{JobError, JobHandle, JobQueue, JobState, JobStatus};
pub use pipeline::{Pipeline, ProcessingApi};
pub use registry::{FileRecord, FileRegistry};
pub use service::{ProcessingService, ServiceComponents, ServiceSettings, StartupError};
pub use types::{Answer, FileOutcome, ForgetOutcome, ProcessingError, QueryError};
