//! Training stage
//!
//! Optimizes the volumetric scene representation against the undistorted
//! frames. This is the only GPU-pool stage of the pipeline.

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::executor::{StageContext, StageHandler, StageOutcome};

/// Trains the scene model from the sparse reconstruction.
pub struct TrainModel;

#[async_trait]
impl StageHandler for TrainModel {
    fn name(&self) -> &'static str {
        "train_model"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        let model_dir = ctx.work_dir().join("model");
        tokio::fs::create_dir_all(&model_dir)
            .await
            .context("Failed to create model directory")?;

        info!("Training model for job {}", ctx.job.id);

        // TODO: launch the splat training run against work/undistorted
        // and checkpoint into work/model.

        Ok(StageOutcome::ok())
    }
}
