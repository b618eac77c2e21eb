//! Chain envelope
//!
//! The wire unit handed to the task scheduler: one job's remaining stages in
//! execution order. Submission enqueues the envelope on its head stage's
//! pool queue; a worker pops it, runs the head, and forwards the rest. A
//! stage that fails simply never forwards, which is what makes the chain
//! fail-fast.

use serde::{Deserialize, Serialize};
use splatforge_core::domain::pipeline::PipelineDefinition;
use uuid::Uuid;

/// One stage reference inside a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRef {
    pub name: String,
    /// Pool queue the stage is routed to.
    pub queue: String,
}

/// Ordered chain of stage invocations for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEnvelope {
    /// Run identifier for the whole chain, generated at build time and
    /// recorded on the job as `external_run_id`.
    pub run_id: String,
    pub job_id: String,
    /// Remaining stages, head first.
    pub stages: Vec<StageRef>,
}

impl ChainEnvelope {
    /// Builds the full chain for a job from the pipeline definition.
    pub fn build(job_id: impl Into<String>, pipeline: &PipelineDefinition) -> Self {
        let stages = pipeline
            .stages()
            .iter()
            .map(|descriptor| StageRef {
                name: descriptor.name.clone(),
                queue: descriptor.resource_class.queue_name().to_string(),
            })
            .collect();

        Self {
            run_id: Uuid::new_v4().to_string(),
            job_id: job_id.into(),
            stages,
        }
    }

    /// The next stage to execute, if any.
    pub fn head(&self) -> Option<&StageRef> {
        self.stages.first()
    }

    /// Pops the head stage, returning the envelope for the remainder of the
    /// chain, or `None` when the head was the last stage.
    pub fn advance(mut self) -> Option<Self> {
        if !self.stages.is_empty() {
            self.stages.remove(0);
        }

        if self.stages.is_empty() { None } else { Some(self) }
    }
}
