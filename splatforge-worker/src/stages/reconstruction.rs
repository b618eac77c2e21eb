//! Reconstruction stages
//!
//! Recover camera poses and a sparse point cloud from the frame set, then
//! undistort the frames against the estimated camera model.

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::executor::{StageContext, StageHandler, StageOutcome};

/// Detects local image features in every frame.
pub struct DetectFeatures;

#[async_trait]
impl StageHandler for DetectFeatures {
    fn name(&self) -> &'static str {
        "detect_features"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        info!("Detecting features for job {}", ctx.job.id);

        // TODO: run the COLMAP feature extractor over work/frames.

        Ok(StageOutcome::ok())
    }
}

/// Matches detected features across frame pairs.
pub struct MatchFeatures;

#[async_trait]
impl StageHandler for MatchFeatures {
    fn name(&self) -> &'static str {
        "match_features"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        info!("Matching features for job {}", ctx.job.id);

        // TODO: run the COLMAP sequential matcher.

        Ok(StageOutcome::ok())
    }
}

/// Solves camera poses and triangulates the sparse point cloud.
pub struct BuildSparseModel;

#[async_trait]
impl StageHandler for BuildSparseModel {
    fn name(&self) -> &'static str {
        "build_sparse_model"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        let sparse_dir = ctx.work_dir().join("sparse");
        tokio::fs::create_dir_all(&sparse_dir)
            .await
            .context("Failed to create sparse model directory")?;

        info!("Building sparse model for job {}", ctx.job.id);

        // TODO: run the COLMAP mapper and keep the largest reconstruction.

        Ok(StageOutcome::ok())
    }
}

/// Undistorts frames against the estimated camera model.
pub struct UndistortImages;

#[async_trait]
impl StageHandler for UndistortImages {
    fn name(&self) -> &'static str {
        "undistort_images"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        let undistorted_dir = ctx.work_dir().join("undistorted");
        tokio::fs::create_dir_all(&undistorted_dir)
            .await
            .context("Failed to create undistorted images directory")?;

        info!("Undistorting images for job {}", ctx.job.id);

        // TODO: run the COLMAP image undistorter.

        Ok(StageOutcome::ok())
    }
}
