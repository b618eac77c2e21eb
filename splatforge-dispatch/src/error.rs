//! Dispatch error types

use splatforge_core::domain::job::JobStatus;
use splatforge_store::StoreError;
use thiserror::Error;

/// Errors from the task scheduler boundary.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The broker could not be reached within the retry policy.
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),

    /// A broker command failed.
    #[error("broker command failed: {0}")]
    Broker(#[from] redis::RedisError),

    /// A chain envelope could not be encoded or decoded.
    #[error("chain payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// The chain has no stages left to enqueue.
    #[error("chain {0} has no stages to enqueue")]
    EmptyChain(String),
}

/// Errors from dispatching a job.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("job {0} not found")]
    JobNotFound(String),

    /// The job already has a run id; dispatch happens at most once.
    #[error("job {id} already dispatched as run {run_id}")]
    AlreadyDispatched { id: String, run_id: String },

    /// Only queued jobs can be dispatched.
    #[error("job {id} cannot be dispatched from status {status}")]
    InvalidState { id: String, status: JobStatus },

    /// Chain submission failed; the job has been marked failed.
    #[error("chain submission failed: {0}")]
    Submit(#[source] SchedulerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
