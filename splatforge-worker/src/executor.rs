//! Stage executor
//!
//! Runs one stage of a chain envelope under the stage contract: load the
//! job, stop early if it is already terminal, apply the entry transition,
//! run the stage body, and report failure or completion through the job
//! store. Downstream stages only run if this one asks for the chain to
//! advance, which keeps the whole pipeline fail-fast.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use splatforge_core::domain::job::Job;
use splatforge_core::domain::patch::JobPatch;
use splatforge_core::domain::pipeline::PipelineDefinition;
use splatforge_dispatch::ChainEnvelope;
use splatforge_store::JobStore;
use tracing::{error, info, warn};

use crate::stages::StageRegistry;

/// Result of a successful stage body.
#[derive(Debug, Default)]
pub struct StageOutcome {
    /// Relative location of the final artifact. Only the terminal stage
    /// reports one.
    pub output_path: Option<String>,
}

impl StageOutcome {
    /// Success with nothing to report.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Success carrying the final artifact location.
    pub fn with_artifact(path: impl Into<String>) -> Self {
        Self {
            output_path: Some(path.into()),
        }
    }
}

/// Execution context handed to a stage body.
pub struct StageContext {
    /// The job row as it stood when the stage started, after any entry
    /// transition.
    pub job: Job,
    /// Root directory for per-job working files.
    pub data_dir: PathBuf,
}

impl StageContext {
    /// Root directory for this job's files.
    pub fn job_dir(&self) -> PathBuf {
        self.data_dir.join(&self.job.id)
    }

    /// Scratch space for intermediate pipeline products.
    pub fn work_dir(&self) -> PathBuf {
        self.job_dir().join("work")
    }

    /// Directory the exported asset lands in.
    pub fn output_dir(&self) -> PathBuf {
        self.job_dir().join("output")
    }

    /// Absolute location of the job's source media.
    pub fn input_path(&self) -> PathBuf {
        self.data_dir.join(&self.job.input_path)
    }
}

/// A pipeline stage body.
///
/// Implementations are looked up by `name()` against the stage names
/// carried in chain envelopes. The body reports progress only through its
/// return value; all job-row bookkeeping belongs to the executor.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Stage name this handler implements. Must match the pipeline catalog.
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome>;
}

/// What the consumer should do with the chain after a stage ran.
#[derive(Debug)]
pub enum StageDisposition {
    /// Stage succeeded; forward the remaining chain.
    Advance(ChainEnvelope),
    /// The terminal stage succeeded; the chain is finished.
    Completed,
    /// The chain stops here; downstream stages never run.
    Halted,
}

/// Executes chain heads against the registered stage handlers.
pub struct StageExecutor {
    store: Arc<dyn JobStore>,
    registry: StageRegistry,
    pipeline: PipelineDefinition,
    data_dir: PathBuf,
}

impl StageExecutor {
    pub fn new(
        store: Arc<dyn JobStore>,
        registry: StageRegistry,
        pipeline: PipelineDefinition,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            registry,
            pipeline,
            data_dir,
        }
    }

    /// Runs the head stage of `chain` and decides what happens to the rest.
    pub async fn execute(&self, chain: ChainEnvelope) -> StageDisposition {
        let job_id = chain.job_id.clone();

        let Some(stage_name) = chain.head().map(|stage| stage.name.clone()) else {
            warn!("Dropping chain {} with no stages left", chain.run_id);
            return StageDisposition::Halted;
        };

        // A vanished job halts the chain without taking the worker down.
        let job = match self.store.get(&job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!(
                    "Job {} not found before stage {}; halting chain",
                    job_id, stage_name
                );
                return StageDisposition::Halted;
            }
            Err(err) => {
                error!(
                    "Failed to load job {} before stage {}: {}",
                    job_id, stage_name, err
                );
                return StageDisposition::Halted;
            }
        };

        // Cancelled (or otherwise terminal) jobs stop before any work runs.
        if job.status.is_terminal() {
            info!(
                "Job {} is {} before stage {}; halting chain",
                job_id, job.status, stage_name
            );
            return StageDisposition::Halted;
        }

        let Some(handler) = self.registry.get(&stage_name) else {
            error!("No handler registered for stage {}", stage_name);
            self.report_failure(
                &job_id,
                &stage_name,
                format!("no handler registered for stage '{}'", stage_name),
            )
            .await;
            return StageDisposition::Halted;
        };

        // First stage of a phase: move the job to the phase's status before
        // doing any work, so readers see where the job is.
        let entry_status = self
            .pipeline
            .find(&stage_name)
            .and_then(|descriptor| descriptor.status_on_entry);

        let job = match entry_status {
            Some(status) => {
                match self
                    .store
                    .apply_update(&job_id, JobPatch::transition(status))
                    .await
                {
                    Ok(job) => job,
                    Err(err) => {
                        error!(
                            "Failed to record entry status for job {} at stage {}: {}",
                            job_id, stage_name, err
                        );
                        return StageDisposition::Halted;
                    }
                }
            }
            None => job,
        };

        info!("Starting stage {} for job {}", stage_name, job_id);

        let ctx = StageContext {
            job,
            data_dir: self.data_dir.clone(),
        };

        match handler.run(&ctx).await {
            Ok(outcome) => match chain.advance() {
                Some(rest) => {
                    info!("Stage {} finished for job {}", stage_name, job_id);
                    StageDisposition::Advance(rest)
                }
                None => {
                    let patch = JobPatch::completed(outcome.output_path);
                    match self.store.apply_update(&job_id, patch).await {
                        Ok(_) => {
                            info!("Pipeline finished for job {}", job_id);
                            StageDisposition::Completed
                        }
                        Err(err) => {
                            error!("Failed to record completion of job {}: {}", job_id, err);
                            StageDisposition::Halted
                        }
                    }
                }
            },
            Err(err) => {
                error!("Stage {} failed for job {}: {:#}", stage_name, job_id, err);
                self.report_failure(&job_id, &stage_name, format!("{:#}", err))
                    .await;
                StageDisposition::Halted
            }
        }
    }

    /// Marks the job failed at the given stage, best effort. The consumer
    /// uses this when a chain remainder cannot be handed back to its queue.
    pub(crate) async fn report_failure(&self, job_id: &str, stage_name: &str, message: String) {
        let patch = JobPatch::failed(stage_name, message);
        if let Err(err) = self.store.apply_update(job_id, patch).await {
            error!(
                "Failed to record failure of stage {} for job {}: {}",
                stage_name, job_id, err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use splatforge_core::domain::job::JobStatus;
    use splatforge_store::MemoryJobStore;

    struct ScriptedHandler {
        name: &'static str,
        fail_with: Option<&'static str>,
        artifact: Option<&'static str>,
        observed: Arc<Mutex<Vec<(String, JobStatus)>>>,
    }

    impl ScriptedHandler {
        fn succeeding(name: &'static str, observed: Arc<Mutex<Vec<(String, JobStatus)>>>) -> Self {
            Self {
                name,
                fail_with: None,
                artifact: None,
                observed,
            }
        }

        fn failing(
            name: &'static str,
            message: &'static str,
            observed: Arc<Mutex<Vec<(String, JobStatus)>>>,
        ) -> Self {
            Self {
                name,
                fail_with: Some(message),
                artifact: None,
                observed,
            }
        }
    }

    #[async_trait]
    impl StageHandler for ScriptedHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, ctx: &StageContext) -> anyhow::Result<StageOutcome> {
            self.observed
                .lock()
                .unwrap()
                .push((self.name.to_string(), ctx.job.status));

            if let Some(message) = self.fail_with {
                anyhow::bail!("{}", message);
            }

            match self.artifact {
                Some(path) => Ok(StageOutcome::with_artifact(path)),
                None => Ok(StageOutcome::ok()),
            }
        }
    }

    fn observed() -> Arc<Mutex<Vec<(String, JobStatus)>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    async fn queued_job(store: &MemoryJobStore) -> Job {
        store
            .create(Job::new(
                Some("garden".to_string()),
                None,
                "abcdefghijkl/input/input.mp4".to_string(),
            ))
            .await
            .unwrap()
    }

    fn executor(store: Arc<MemoryJobStore>, registry: StageRegistry) -> StageExecutor {
        StageExecutor::new(
            store,
            registry,
            PipelineDefinition::standard(),
            PathBuf::from("/tmp/splatforge-test"),
        )
    }

    fn full_chain(job_id: &str) -> ChainEnvelope {
        ChainEnvelope::build(job_id, &PipelineDefinition::standard())
    }

    #[tokio::test]
    async fn test_entry_transition_is_applied_before_the_body_runs() {
        let store = Arc::new(MemoryJobStore::new());
        let job = queued_job(&store).await;
        let log = observed();

        let mut registry = StageRegistry::new();
        registry.register(ScriptedHandler::succeeding("extract_frames", log.clone()));
        let executor = executor(store.clone(), registry);

        let disposition = executor.execute(full_chain(&job.id)).await;
        assert!(matches!(disposition, StageDisposition::Advance(_)));

        // The body saw the job already moved into the preprocessing phase.
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[("extract_frames".to_string(), JobStatus::Preprocessing)]
        );
        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Preprocessing);
    }

    #[tokio::test]
    async fn test_mid_phase_stage_leaves_the_status_alone() {
        let store = Arc::new(MemoryJobStore::new());
        let job = queued_job(&store).await;
        store
            .apply_update(&job.id, JobPatch::transition(JobStatus::Preprocessing))
            .await
            .unwrap();
        let log = observed();

        let mut registry = StageRegistry::new();
        registry.register(ScriptedHandler::succeeding("segment_background", log.clone()));
        let executor = executor(store.clone(), registry);

        let chain = full_chain(&job.id).advance().unwrap();
        assert_eq!(chain.head().unwrap().name, "segment_background");

        let disposition = executor.execute(chain).await;
        assert!(matches!(disposition, StageDisposition::Advance(_)));

        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Preprocessing);
    }

    #[tokio::test]
    async fn test_failing_stage_marks_the_job_and_halts() {
        let store = Arc::new(MemoryJobStore::new());
        let job = queued_job(&store).await;
        let log = observed();

        let mut registry = StageRegistry::new();
        registry.register(ScriptedHandler::failing(
            "extract_frames",
            "ffmpeg exited with code 1",
            log.clone(),
        ));
        let executor = executor(store.clone(), registry);

        let disposition = executor.execute(full_chain(&job.id)).await;
        assert!(matches!(disposition, StageDisposition::Halted));

        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_step.as_deref(), Some("extract_frames"));
        assert!(
            stored
                .error_message
                .as_deref()
                .unwrap()
                .contains("ffmpeg exited with code 1")
        );
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_job_halts_before_the_body_runs() {
        let store = Arc::new(MemoryJobStore::new());
        let job = queued_job(&store).await;
        store
            .apply_update(&job.id, JobPatch::transition(JobStatus::Cancelled))
            .await
            .unwrap();
        let log = observed();

        let mut registry = StageRegistry::new();
        registry.register(ScriptedHandler::succeeding("extract_frames", log.clone()));
        let executor = executor(store.clone(), registry);

        let disposition = executor.execute(full_chain(&job.id)).await;
        assert!(matches!(disposition, StageDisposition::Halted));

        assert!(log.lock().unwrap().is_empty());
        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_final_stage_success_completes_the_job() {
        let store = Arc::new(MemoryJobStore::new());
        let job = queued_job(&store).await;
        store
            .apply_update(&job.id, JobPatch::transition(JobStatus::RunningTraining))
            .await
            .unwrap();
        let log = observed();

        let mut registry = StageRegistry::new();
        registry.register(ScriptedHandler {
            name: "export_asset",
            fail_with: None,
            artifact: Some("abcdefghijkl/output/scene.splat"),
            observed: log.clone(),
        });
        let executor = executor(store.clone(), registry);

        // Chain with only the terminal stage left.
        let mut chain = full_chain(&job.id);
        while chain.stages.len() > 1 {
            chain = chain.advance().unwrap();
        }
        assert_eq!(chain.head().unwrap().name, "export_asset");

        let disposition = executor.execute(chain).await;
        assert!(matches!(disposition, StageDisposition::Completed));

        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(
            stored.output_path.as_deref(),
            Some("abcdefghijkl/output/scene.splat")
        );
        assert!(stored.completed_at.is_some());
        // The exporter saw the job in its postprocessing phase.
        assert_eq!(
            log.lock().unwrap().as_slice(),
            &[("export_asset".to_string(), JobStatus::Postprocessing)]
        );
    }

    #[tokio::test]
    async fn test_unknown_stage_fails_the_job() {
        let store = Arc::new(MemoryJobStore::new());
        let job = queued_job(&store).await;

        let executor = executor(store.clone(), StageRegistry::new());

        let disposition = executor.execute(full_chain(&job.id)).await;
        assert!(matches!(disposition, StageDisposition::Halted));

        let stored = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.failed_step.as_deref(), Some("extract_frames"));
    }

    #[tokio::test]
    async fn test_missing_job_halts_without_panicking() {
        let store = Arc::new(MemoryJobStore::new());
        let log = observed();

        let mut registry = StageRegistry::new();
        registry.register(ScriptedHandler::succeeding("extract_frames", log.clone()));
        let executor = executor(store, registry);

        let disposition = executor.execute(full_chain("nosuchjobxyz")).await;
        assert!(matches!(disposition, StageDisposition::Halted));
        assert!(log.lock().unwrap().is_empty());
    }
}
