//! Splatforge Worker
//!
//! A stateless worker that executes pipeline stages for submitted jobs.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Consumer: Pops chain envelopes from the pool queues it serves
//! - Executor: Runs one stage per envelope under the stage contract
//! - Stages: One handler per pipeline stage, from frame extraction to export
//!
//! Workers share the job store with the gateway and report progress by
//! applying patches to the job row; they never talk to the gateway directly.

pub mod config;
pub mod consumer;
pub mod executor;
pub mod stages;
