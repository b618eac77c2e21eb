//! Health Check API Handler
//!
//! Liveness endpoint that also reports job store connectivity.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::AppState;

/// GET /health
/// Health check endpoint, including a job store connectivity check
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!("Health check store query failed: {}", err);
            "disconnected/error"
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "database": database })),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use splatforge_core::domain::pipeline::PipelineDefinition;
    use splatforge_dispatch::MemoryScheduler;
    use splatforge_store::MemoryJobStore;

    use super::*;

    #[tokio::test]
    async fn test_health_reports_store_connectivity() {
        let state = AppState {
            store: Arc::new(MemoryJobStore::new()),
            scheduler: Arc::new(MemoryScheduler::new()),
            pipeline: Arc::new(PipelineDefinition::standard()),
        };

        let (status, Json(body)) = health_check(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "connected");
    }
}
