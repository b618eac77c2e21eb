//! In-memory job store
//!
//! HashMap-backed implementation for tests and single-process development.
//! The mutex around the map stands in for the per-row lock the Postgres
//! store takes, keeping `apply_update` atomic per job.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use splatforge_core::domain::job::Job;
use splatforge_core::domain::patch::JobPatch;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::JobStore;

/// In-memory [`JobStore`].
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: Job) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock().await;

        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }

        jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.lock().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.lock().await;

        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(all)
    }

    async fn apply_update(&self, id: &str, patch: JobPatch) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock().await;

        let current = jobs
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        match patch.apply_to(current, Utc::now()) {
            Some(updated) => {
                jobs.insert(id.to_string(), updated.clone());
                Ok(updated)
            }
            None => Ok(current.clone()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        // In-process map, reachable whenever the process is.
        Ok(())
    }
}
