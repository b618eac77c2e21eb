//! Splatforge Dispatch
//!
//! Hands queued jobs to the task scheduler as fail-fast stage chains and
//! defines the scheduler contract itself.
//!
//! The scheduler is an external collaborator with a deliberately narrow
//! surface: it accepts an ordered chain of named work units, routes each to
//! a resource pool queue, and redelivers the remainder after every
//! successful stage. [`RedisScheduler`] is the production implementation;
//! [`MemoryScheduler`] backs tests.

pub mod chain;
pub mod dispatcher;
pub mod error;
pub mod scheduler;

// Re-export the common surface
pub use chain::{ChainEnvelope, StageRef};
pub use dispatcher::dispatch_job;
pub use error::{DispatchError, SchedulerError};
pub use scheduler::{MemoryScheduler, RedisScheduler, RetryPolicy, TaskScheduler};
