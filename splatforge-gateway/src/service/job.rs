//! Job Service
//!
//! Business logic for job submission and lifecycle.

use splatforge_core::domain::job::{Job, JobStatus};
use splatforge_core::domain::patch::JobPatch;
use splatforge_core::dto::job::CreateJob;
use splatforge_store::{JobStore, StoreError};

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(String),
    InvalidState(String),
    ValidationError(String),
    StoreError(StoreError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => JobError::NotFound(id),
            other => JobError::StoreError(other),
        }
    }
}

/// Create a new job in the Queued state
pub async fn create_job(store: &dyn JobStore, req: CreateJob) -> Result<Job, JobError> {
    validate_create_request(&req)?;

    let job = Job::new(req.name, req.description, req.input_path);
    let job = store.create(job).await?;

    tracing::info!("Job created: {} (input: {})", job.id, job.input_path);

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(store: &dyn JobStore, id: &str) -> Result<Job, JobError> {
    let job = store
        .get(id)
        .await?
        .ok_or_else(|| JobError::NotFound(id.to_string()))?;

    Ok(job)
}

/// List all jobs, newest first
pub async fn list_jobs(store: &dyn JobStore) -> Result<Vec<Job>, JobError> {
    let jobs = store.list().await?;
    Ok(jobs)
}

/// Cancel a job that has not reached a terminal state
pub async fn cancel_job(store: &dyn JobStore, id: &str) -> Result<(), JobError> {
    let job = store
        .get(id)
        .await?
        .ok_or_else(|| JobError::NotFound(id.to_string()))?;

    if job.status.is_terminal() {
        return Err(JobError::InvalidState(format!(
            "Cannot cancel job {} in status {}",
            id, job.status
        )));
    }

    // If the job turns terminal between the check and this write, the patch
    // merge suppresses the status change, so the race is harmless.
    store
        .apply_update(id, JobPatch::transition(JobStatus::Cancelled))
        .await?;

    tracing::info!("Job {} cancelled", id);

    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn validate_create_request(req: &CreateJob) -> Result<(), JobError> {
    if req.input_path.trim().is_empty() {
        return Err(JobError::ValidationError(
            "input_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use splatforge_store::MemoryJobStore;

    fn create_request(input_path: &str) -> CreateJob {
        CreateJob {
            name: Some("garden".to_string()),
            description: None,
            input_path: input_path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_job_starts_queued() {
        let store = MemoryJobStore::new();

        let job = create_job(&store, create_request("abcdefghijkl/input/input.mp4"))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_job_rejects_empty_input_path() {
        let store = MemoryJobStore::new();

        let result = create_job(&store, create_request("  ")).await;

        assert!(matches!(result, Err(JobError::ValidationError(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_job_is_not_found() {
        let store = MemoryJobStore::new();

        let result = get_job(&store, "nosuchjobxyz").await;

        assert!(matches!(result, Err(JobError::NotFound(_))));
    }

    #[test]
    fn test_store_errors_map_to_service_errors() {
        let err = JobError::from(StoreError::NotFound("nosuchjobxyz".to_string()));
        assert!(matches!(err, JobError::NotFound(id) if id == "nosuchjobxyz"));

        let err = JobError::from(StoreError::AlreadyExists("abcdefghijkl".to_string()));
        assert!(matches!(
            err,
            JobError::StoreError(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_queued_job() {
        let store = MemoryJobStore::new();
        let job = create_job(&store, create_request("abcdefghijkl/input/input.mp4"))
            .await
            .unwrap();

        cancel_job(&store, &job.id).await.unwrap();

        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Cancelled);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_terminal_job_is_rejected() {
        let store = MemoryJobStore::new();
        let job = create_job(&store, create_request("abcdefghijkl/input/input.mp4"))
            .await
            .unwrap();

        store
            .apply_update(&job.id, JobPatch::completed(None))
            .await
            .unwrap();

        let result = cancel_job(&store, &job.id).await;
        assert!(matches!(result, Err(JobError::InvalidState(_))));

        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }
}
