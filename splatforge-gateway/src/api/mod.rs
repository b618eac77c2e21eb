//! API Module
//!
//! HTTP API layer for the gateway.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod health;
pub mod job;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use splatforge_core::domain::pipeline::PipelineDefinition;
use splatforge_dispatch::TaskScheduler;
use splatforge_store::JobStore;
use tower_http::trace::TraceLayer;

/// Shared handles for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub pipeline: Arc<PipelineDefinition>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/job/create", post(job::create_job))
        .route("/job/list", get(job::list_jobs))
        .route("/job/{id}", get(job::get_job))
        .route("/job/{id}/dispatch", post(job::dispatch_job))
        .route("/job/{id}/cancel", post(job::cancel_job))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
