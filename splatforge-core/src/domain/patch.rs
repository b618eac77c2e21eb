//! Job update patch
//!
//! The patch is the only way job state changes after creation. Every field
//! is independently optional; [`JobPatch::apply_to`] merges a patch against
//! the current row and decides whether anything needs to be written at all,
//! which is what makes redelivered updates idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{Job, JobStatus};

/// Longest diagnostic text persisted per job.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 1000;

/// Partial update against a [`Job`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub failed_step: Option<String>,
    pub error_message: Option<String>,
    pub output_path: Option<String>,
    pub external_run_id: Option<String>,
}

impl JobPatch {
    /// Patch moving the job to `status`. Used for stage entry transitions
    /// and for external cancellation.
    pub fn transition(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch reporting a failed step. Forces the job to `Failed` unless it
    /// is already terminal.
    pub fn failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            failed_step: Some(step.into()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Patch claiming the scheduler run id for a submission. The merge keeps
    /// the first id ever recorded, so of two racing claims only one lands.
    pub fn dispatched(external_run_id: impl Into<String>) -> Self {
        Self {
            external_run_id: Some(external_run_id.into()),
            ..Self::default()
        }
    }

    /// Patch applied when the final stage succeeds.
    pub fn completed(output_path: Option<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            output_path,
            ..Self::default()
        }
    }

    /// Merges the patch into `current`, returning the job as it should be
    /// persisted, or `None` when the patch changes nothing.
    ///
    /// Merge rules:
    /// - a terminal current status bars all `status` and `completed_at`
    ///   changes; diagnostic fields may still be recorded
    /// - `failed_step` forces the staged status to `Failed`, overriding any
    ///   `status` supplied in the same patch
    /// - `error_message` is truncated to [`ERROR_MESSAGE_MAX_CHARS`]
    /// - `external_run_id` is recorded once; later values never overwrite it
    /// - `completed_at` is set the first time the staged status turns
    ///   terminal, and never afterwards
    pub fn apply_to(&self, current: &Job, now: DateTime<Utc>) -> Option<Job> {
        let mut staged = current.clone();

        if let Some(status) = self.status {
            if !current.status.is_terminal() && status != current.status {
                staged.status = status;
            }
        }

        if let Some(step) = &self.failed_step {
            staged.failed_step = Some(step.clone());
            if !current.status.is_terminal() {
                staged.status = JobStatus::Failed;
            }
        }

        if let Some(message) = &self.error_message {
            staged.error_message = Some(truncate_chars(message, ERROR_MESSAGE_MAX_CHARS));
        }

        if let Some(path) = &self.output_path {
            staged.output_path = Some(path.clone());
        }

        if let Some(run_id) = &self.external_run_id {
            if current.external_run_id.is_none() {
                staged.external_run_id = Some(run_id.clone());
            }
        }

        if staged.status.is_terminal() && staged.completed_at.is_none() {
            staged.completed_at = Some(now);
        }

        if staged == *current { None } else { Some(staged) }
    }
}

/// Truncates on character count so multibyte text never splits mid-byte.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
