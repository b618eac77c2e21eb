//! Dispatcher
//!
//! Hands a queued job to the task scheduler as a fail-fast chain.
//! Submission is attempted at most once per job: a retry would enqueue a
//! second chain for the same work, so a failed submission marks the job
//! `Failed` instead of retrying.

use splatforge_core::domain::job::JobStatus;
use splatforge_core::domain::patch::JobPatch;
use splatforge_core::domain::pipeline::PipelineDefinition;
use splatforge_store::JobStore;

use crate::chain::ChainEnvelope;
use crate::error::DispatchError;
use crate::scheduler::TaskScheduler;

/// Builds the stage chain for a queued job and submits it to the scheduler.
///
/// The run id is claimed on the job row before anything is enqueued. The
/// patch merge records a run id at most once, so two dispatches racing past
/// the guards collapse to a single submission: the loser finds the winner's
/// id on the returned row and backs off. On success the job stays `Queued`
/// until the first stage picks it up; on submission failure it is marked
/// `Failed` with `failed_step = "dispatch"` and keeps the claimed run id.
pub async fn dispatch_job(
    store: &dyn JobStore,
    scheduler: &dyn TaskScheduler,
    pipeline: &PipelineDefinition,
    job_id: &str,
) -> Result<String, DispatchError> {
    let job = store
        .get(job_id)
        .await?
        .ok_or_else(|| DispatchError::JobNotFound(job_id.to_string()))?;

    if let Some(run_id) = job.external_run_id {
        return Err(DispatchError::AlreadyDispatched { id: job.id, run_id });
    }

    if job.status != JobStatus::Queued {
        return Err(DispatchError::InvalidState {
            id: job.id,
            status: job.status,
        });
    }

    let chain = ChainEnvelope::build(job_id, pipeline);

    let claimed = store
        .apply_update(job_id, JobPatch::dispatched(&chain.run_id))
        .await?;

    if claimed.external_run_id.as_deref() != Some(chain.run_id.as_str()) {
        return Err(DispatchError::AlreadyDispatched {
            id: claimed.id,
            run_id: claimed.external_run_id.unwrap_or_default(),
        });
    }

    if claimed.status != JobStatus::Queued {
        // Cancelled or failed between the read and the claim.
        return Err(DispatchError::InvalidState {
            id: claimed.id,
            status: claimed.status,
        });
    }

    match scheduler.submit(&chain).await {
        Ok(run_id) => {
            tracing::info!("Submitted chain for job {} as run {}", job_id, run_id);
            Ok(run_id)
        }
        Err(err) => {
            tracing::error!("Chain submission failed for job {}: {}", job_id, err);

            let patch = JobPatch::failed("dispatch", err.to_string());
            if let Err(store_err) = store.apply_update(job_id, patch).await {
                tracing::error!(
                    "Failed to mark job {} as failed after dispatch error: {}",
                    job_id,
                    store_err
                );
            }

            Err(DispatchError::Submit(err))
        }
    }
}
