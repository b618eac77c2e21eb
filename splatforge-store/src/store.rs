//! Job store contract

use async_trait::async_trait;
use splatforge_core::domain::job::Job;
use splatforge_core::domain::patch::JobPatch;

use crate::error::StoreError;

/// Persistence contract for job records.
///
/// `apply_update` is the single mutation entry point after creation. Each
/// implementation must run the patch merge as one atomic read-modify-write
/// per job, so that concurrent updates serialize and redeliveries stay
/// idempotent.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persists a new job. Fails with [`StoreError::AlreadyExists`] when the
    /// id collides.
    async fn create(&self, job: Job) -> Result<Job, StoreError>;

    /// Fetches a job by id.
    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError>;

    /// Lists all jobs, newest first.
    async fn list(&self) -> Result<Vec<Job>, StoreError>;

    /// Applies a patch to a job and returns the row as it stands after the
    /// call: the updated row when the patch staged changes, the unchanged
    /// row when it was a no-op. Fails with [`StoreError::NotFound`] when the
    /// job does not exist.
    async fn apply_update(&self, id: &str, patch: JobPatch) -> Result<Job, StoreError>;

    /// Verifies the backing store is reachable. Used by health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}
