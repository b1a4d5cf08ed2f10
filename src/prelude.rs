//! Convenience re-exports for common types.

pub use crate::config::SchedulerConfig;
pub use crate::error::RunnableFailure;
pub use crate::scheduler::{ErrorHandler, Scheduler, SchedulerBuilder, Snapshot};
pub use crate::task::{Tag, TaskHandle, TaskRequest, TaskState};
