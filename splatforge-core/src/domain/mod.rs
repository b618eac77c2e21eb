//! Core domain types
//!
//! This module contains the core domain structures used across Splatforge
//! services. These types represent the fundamental business entities and are
//! shared between the gateway (for persistence and dispatch) and the worker
//! (for stage execution and status updates).

pub mod job;
pub mod patch;
pub mod pipeline;
