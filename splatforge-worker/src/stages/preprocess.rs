//! Preprocessing stages
//!
//! Turn the uploaded capture into a clean frame set the reconstruction
//! phase can work with.

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::executor::{StageContext, StageHandler, StageOutcome};

/// Samples still frames out of the uploaded video.
pub struct ExtractFrames;

#[async_trait]
impl StageHandler for ExtractFrames {
    fn name(&self) -> &'static str {
        "extract_frames"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        let frames_dir = ctx.work_dir().join("frames");
        tokio::fs::create_dir_all(&frames_dir)
            .await
            .context("Failed to create frames directory")?;

        info!(
            "Extracting frames from {} into {}",
            ctx.input_path().display(),
            frames_dir.display()
        );

        // TODO: invoke ffmpeg to sample frames from the input video.

        Ok(StageOutcome::ok())
    }
}

/// Masks out the background of every extracted frame.
pub struct SegmentBackground;

#[async_trait]
impl StageHandler for SegmentBackground {
    fn name(&self) -> &'static str {
        "segment_background"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        let masks_dir = ctx.work_dir().join("masks");
        tokio::fs::create_dir_all(&masks_dir)
            .await
            .context("Failed to create masks directory")?;

        info!("Segmenting frames for job {}", ctx.job.id);

        // TODO: run the matting model over the extracted frames.

        Ok(StageOutcome::ok())
    }
}
