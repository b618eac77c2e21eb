//! Stage handler catalog
//!
//! One handler per pipeline stage, grouped by phase. The registry maps the
//! stage names carried in chain envelopes to their implementations.

pub mod export;
pub mod preprocess;
pub mod reconstruction;
pub mod training;

pub use export::ExportAsset;
pub use preprocess::{ExtractFrames, SegmentBackground};
pub use reconstruction::{BuildSparseModel, DetectFeatures, MatchFeatures, UndistortImages};
pub use training::TrainModel;

use crate::executor::StageHandler;

/// Registry of stage handlers, looked up by stage name.
pub struct StageRegistry {
    handlers: Vec<Box<dyn StageHandler>>,
}

impl StageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Creates a registry with every stage of the standard pipeline.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ExtractFrames);
        registry.register(SegmentBackground);
        registry.register(DetectFeatures);
        registry.register(MatchFeatures);
        registry.register(BuildSparseModel);
        registry.register(UndistortImages);
        registry.register(TrainModel);
        registry.register(ExportAsset);
        registry
    }

    /// Registers a stage handler.
    pub fn register(&mut self, handler: impl StageHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Finds the handler for a stage name.
    pub fn get(&self, name: &str) -> Option<&dyn StageHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.name() == name)
            .map(|handler| handler.as_ref())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
