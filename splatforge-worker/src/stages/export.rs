//! Export stage
//!
//! Packages the trained model into the downloadable asset and reports its
//! location, which the executor records on the job row at completion.

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::executor::{StageContext, StageHandler, StageOutcome};

/// Converts the trained model into the final `.splat` asset.
pub struct ExportAsset;

#[async_trait]
impl StageHandler for ExportAsset {
    fn name(&self) -> &'static str {
        "export_asset"
    }

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
        let output_dir = ctx.output_dir();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .context("Failed to create output directory")?;

        // TODO: convert the trained checkpoint from work/model into
        // output/scene.splat.

        // Recorded relative to the data dir, so the gateway can resolve it
        // against whatever storage root it mounts.
        let artifact = format!("{}/output/scene.splat", ctx.job.id);
        info!("Exported asset for job {} at {}", ctx.job.id, artifact);

        Ok(StageOutcome::with_artifact(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splatforge_core::domain::job::Job;

    #[tokio::test]
    async fn test_export_reports_the_artifact_relative_to_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new(None, None, "input/input.mp4".to_string());
        let job_id = job.id.clone();
        let ctx = StageContext {
            job,
            data_dir: dir.path().to_path_buf(),
        };

        let outcome = ExportAsset.run(&ctx).await.unwrap();

        assert_eq!(
            outcome.output_path.as_deref(),
            Some(format!("{}/output/scene.splat", job_id).as_str())
        );
        assert!(ctx.output_dir().is_dir());
    }
}
