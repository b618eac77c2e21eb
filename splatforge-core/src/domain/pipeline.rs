//! Pipeline definition
//!
//! The static catalog of stages a job passes through, in execution order.
//! The gateway uses it to build dispatch chains; the worker uses it to look
//! up entry transitions. Both sides must agree, which is why it lives here.

use serde::{Deserialize, Serialize};

use super::job::JobStatus;

/// Kind of worker pool a stage is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Cpu,
    Gpu,
}

impl ResourceClass {
    /// Name of the pool queue this class maps to.
    pub fn queue_name(&self) -> &'static str {
        match self {
            ResourceClass::Cpu => "cpu",
            ResourceClass::Gpu => "gpu",
        }
    }

    pub fn parse(s: &str) -> Option<ResourceClass> {
        match s {
            "cpu" => Some(ResourceClass::Cpu),
            "gpu" => Some(ResourceClass::Gpu),
            _ => None,
        }
    }
}

/// One stage in the pipeline catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    pub name: String,
    pub resource_class: ResourceClass,
    /// Status the job moves to when this stage starts. `None` for stages
    /// that continue the phase the previous stage opened.
    pub status_on_entry: Option<JobStatus>,
}

impl StageDescriptor {
    pub fn new(
        name: &str,
        resource_class: ResourceClass,
        status_on_entry: Option<JobStatus>,
    ) -> Self {
        Self {
            name: name.to_string(),
            resource_class,
            status_on_entry,
        }
    }
}

/// Ordered set of stages a job runs through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    stages: Vec<StageDescriptor>,
}

impl PipelineDefinition {
    /// The standard video-to-splat pipeline: preprocessing, sparse
    /// reconstruction, training, export.
    pub fn standard() -> Self {
        use JobStatus::*;
        use ResourceClass::*;

        Self {
            stages: vec![
                StageDescriptor::new("extract_frames", Cpu, Some(Preprocessing)),
                StageDescriptor::new("segment_background", Cpu, None),
                StageDescriptor::new("detect_features", Cpu, Some(RunningReconstruction)),
                StageDescriptor::new("match_features", Cpu, None),
                StageDescriptor::new("build_sparse_model", Cpu, None),
                StageDescriptor::new("undistort_images", Cpu, None),
                StageDescriptor::new("train_model", Gpu, Some(RunningTraining)),
                StageDescriptor::new("export_asset", Cpu, Some(Postprocessing)),
            ],
        }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Looks up a stage by name.
    pub fn find(&self, name: &str) -> Option<&StageDescriptor> {
        self.stages.iter().find(|stage| stage.name == name)
    }
}
