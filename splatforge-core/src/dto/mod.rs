//! Data Transfer Objects for service boundaries
//!
//! This module contains DTOs used at the edges of Splatforge services.
//! DTOs are lightweight representations of domain entities optimized for
//! network transfer.

pub mod job;
