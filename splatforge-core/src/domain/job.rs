//! Job domain types

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet used for job identifiers. 26^12 ids keep collisions negligible
/// while staying readable in logs and file paths.
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 12;

/// Durable record of one submitted media job.
///
/// Structure shared between the gateway (persists) and the worker (updates).
/// After creation, `id`, `name`, `description`, `input_path` and `created_at`
/// never change; everything else is mutated only through
/// [`JobPatch::apply_to`](super::patch::JobPatch::apply_to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: JobStatus,
    /// Name of the pipeline stage that failed, or `"dispatch"` when the
    /// chain never reached the scheduler.
    pub failed_step: Option<String>,
    /// Run identifier assigned by the task scheduler at dispatch time.
    pub external_run_id: Option<String>,
    /// Location of the uploaded source media, relative to the shared data
    /// root. Opaque to the core.
    pub input_path: String,
    /// Location of the exported asset, recorded by the final stage.
    pub output_path: Option<String>,
    pub error_message: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Set exactly once, when the job first reaches a terminal status.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    /// Creates a new job in the initial `Queued` state with a freshly
    /// generated id.
    pub fn new(name: Option<String>, description: Option<String>, input_path: String) -> Self {
        Self {
            id: generate_job_id(),
            name,
            description,
            status: JobStatus::Queued,
            failed_step: None,
            external_run_id: None,
            input_path,
            output_path: None,
            error_message: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }
}

/// Job lifecycle status
///
/// Jobs move forward along a single path from `Queued` to `Completed`.
/// `Failed` is reachable from any non-terminal status; `Cancelled` is set
/// only by an external actor, never by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Preprocessing,
    RunningReconstruction,
    RunningTraining,
    Postprocessing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Canonical string form, shared by the JSON wire format and the
    /// database column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Preprocessing => "PREPROCESSING",
            JobStatus::RunningReconstruction => "RUNNING_RECONSTRUCTION",
            JobStatus::RunningTraining => "RUNNING_TRAINING",
            JobStatus::Postprocessing => "POSTPROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    /// Parses the canonical string form back into a status.
    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "QUEUED" => Some(JobStatus::Queued),
            "PREPROCESSING" => Some(JobStatus::Preprocessing),
            "RUNNING_RECONSTRUCTION" => Some(JobStatus::RunningReconstruction),
            "RUNNING_TRAINING" => Some(JobStatus::RunningTraining),
            "POSTPROCESSING" => Some(JobStatus::Postprocessing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            "CANCELLED" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses are write-once: once a job reaches one, its
    /// `status` and `completed_at` never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generates a 12-character job id from the lowercase alphabet.
pub fn generate_job_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_twelve_lowercase_letters() {
        let id = generate_job_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_job_id(), generate_job_id());
    }

    #[test]
    fn test_new_job_starts_queued() {
        let job = Job::new(
            Some("garden".to_string()),
            None,
            "abcdefghijkl/input/input.mp4".to_string(),
        );

        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.failed_step.is_none());
        assert!(job.external_run_id.is_none());
        assert!(job.output_path.is_none());
        assert!(job.error_message.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_status_string_round_trip() {
        let all = [
            JobStatus::Queued,
            JobStatus::Preprocessing,
            JobStatus::RunningReconstruction,
            JobStatus::RunningTraining,
            JobStatus::Postprocessing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ];

        for status in all {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("RUNNING"), None);
    }

    #[test]
    fn test_status_json_form_is_screaming_snake() {
        let encoded = serde_json::to_string(&JobStatus::RunningReconstruction).unwrap();
        assert_eq!(encoded, "\"RUNNING_RECONSTRUCTION\"");

        let decoded: JobStatus = serde_json::from_str("\"POSTPROCESSING\"").unwrap();
        assert_eq!(decoded, JobStatus::Postprocessing);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Preprocessing.is_terminal());
        assert!(!JobStatus::RunningReconstruction.is_terminal());
        assert!(!JobStatus::RunningTraining.is_terminal());
        assert!(!JobStatus::Postprocessing.is_terminal());
    }
}
