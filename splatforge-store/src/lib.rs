//! Splatforge Store
//!
//! Persistence layer for job records. The gateway and the worker share one
//! `jobs` table through the [`JobStore`] trait; [`PgJobStore`] is the
//! production implementation, [`MemoryJobStore`] backs tests and
//! single-process development.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export the trait and implementations
pub use error::StoreError;
pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;
pub use store::JobStore;
