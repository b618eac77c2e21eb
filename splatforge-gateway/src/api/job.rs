//! Job API Handlers
//!
//! HTTP endpoints for job submission, dispatch, reporting, and cancellation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use splatforge_core::domain::job::Job;
use splatforge_core::dto::job::CreateJob;
use splatforge_dispatch::DispatchError;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::job_service;

// =============================================================================
// Job Lifecycle Endpoints
// =============================================================================

/// POST /job/create
/// Validate and persist a new job in the Queued state
pub async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJob>,
) -> ApiResult<Json<Job>> {
    tracing::info!("Creating job (input: {})", req.input_path);

    let job = job_service::create_job(state.store.as_ref(), req)
        .await
        .map_err(|e| match e {
            job_service::JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            job_service::JobError::NotFound(id) => {
                ApiError::NotFound(format!("Job {} not found", id))
            }
            job_service::JobError::InvalidState(msg) => ApiError::BadRequest(msg),
            job_service::JobError::StoreError(err) => ApiError::StoreError(err),
        })?;

    Ok(Json(job))
}

/// POST /job/{id}/dispatch
/// Submit the job's stage chain to the task scheduler
pub async fn dispatch_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DispatchResponse>> {
    tracing::info!("Dispatching job: {}", id);

    let external_run_id = splatforge_dispatch::dispatch_job(
        state.store.as_ref(),
        state.scheduler.as_ref(),
        &state.pipeline,
        &id,
    )
    .await
    .map_err(|e| match e {
        DispatchError::JobNotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
        DispatchError::AlreadyDispatched { id, run_id } => {
            ApiError::Conflict(format!("Job {} already dispatched as run {}", id, run_id))
        }
        DispatchError::InvalidState { id, status } => ApiError::BadRequest(format!(
            "Job {} cannot be dispatched from status {}",
            id, status
        )),
        DispatchError::Submit(err) => {
            ApiError::BadGateway(format!("Chain submission failed: {}", err))
        }
        DispatchError::Store(err) => ApiError::StoreError(err),
    })?;

    Ok(Json(DispatchResponse { external_run_id }))
}

/// GET /job/{id}
/// Get job details by ID
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(state.store.as_ref(), &id)
        .await
        .map_err(|e| match e {
            job_service::JobError::NotFound(id) => {
                ApiError::NotFound(format!("Job {} not found", id))
            }
            job_service::JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            job_service::JobError::InvalidState(msg) => ApiError::BadRequest(msg),
            job_service::JobError::StoreError(err) => ApiError::StoreError(err),
        })?;

    Ok(Json(job))
}

/// GET /job/list
/// List all jobs, newest first
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing all jobs");

    let jobs = job_service::list_jobs(state.store.as_ref())
        .await
        .map_err(|e| match e {
            job_service::JobError::NotFound(id) => {
                ApiError::NotFound(format!("Job {} not found", id))
            }
            job_service::JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            job_service::JobError::InvalidState(msg) => ApiError::BadRequest(msg),
            job_service::JobError::StoreError(err) => ApiError::StoreError(err),
        })?;

    Ok(Json(jobs))
}

/// POST /job/{id}/cancel
/// Cancel a job that has not reached a terminal state
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Cancelling job: {}", id);

    job_service::cancel_job(state.store.as_ref(), &id)
        .await
        .map_err(|e| match e {
            job_service::JobError::NotFound(id) => {
                ApiError::NotFound(format!("Job {} not found", id))
            }
            job_service::JobError::InvalidState(msg) => ApiError::BadRequest(msg),
            job_service::JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            job_service::JobError::StoreError(err) => ApiError::StoreError(err),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response to a successful dispatch.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub external_run_id: String,
}
