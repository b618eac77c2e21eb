//! Service Module
//!
//! Business logic layer for the gateway.
//! Services orchestrate between the job store, the dispatcher, and the
//! pipeline definition.

pub mod job;

// Re-export for convenience
pub use job as job_service;
