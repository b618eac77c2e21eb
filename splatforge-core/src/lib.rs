//! Splatforge Core
//!
//! Core types for the Splatforge media pipeline.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, JobPatch, PipelineDefinition)
//! - DTOs: Data transfer objects for service boundaries
//!
//! Both the gateway and the worker depend on this crate; neither depends
//! on the other.

pub mod domain;
pub mod dto;
