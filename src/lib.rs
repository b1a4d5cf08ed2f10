//! tickq
//!
//! An in-process delayed-execution scheduler with group-based bulk
//! cancellation.
//!
//! # Overview
//!
//! Callers register a zero-argument runnable to fire at (or after) a future
//! instant, optionally tagged with one or more group identifiers so whole
//! cohorts of pending work can be cancelled together. A background tick loop
//! drives execution without caller intervention:
//!
//! - One-time tasks at an absolute instant or relative delay
//! - Already-due tasks dispatched immediately, bypassing the queue
//! - Bulk cancellation by group tag, plus per-task cancel handles
//! - Panic isolation around every runnable, with an optional error handler
//! - Diagnostic counters over the pending set
//!
//! # Architecture
//!
//! 1. **Due queue**: pending tasks ordered by due time, FIFO on ties
//! 2. **Group index**: tag -> pending tasks, for bulk cancellation
//! 3. **Tick loop**: drains due tasks each interval and launches each
//!    runnable on its own tokio task
//! 4. **Single lock**: queue and index are only ever mutated together, so a
//!    task is never visible in one but not the other
//!
//! The tick interval (default 1s) is the scheduler's time resolution: finer
//! due times are honored, but dispatch happens on the next tick boundary at
//! or after them. The pending set does not persist across restarts.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tickq::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let scheduler: Scheduler<String> = Scheduler::builder()
//!         .with_tick_interval(Duration::from_secs(1))
//!         .with_error_handler(|failure| eprintln!("task failed: {failure}"))
//!         .build();
//!     scheduler.start();
//!
//!     // Fire in five seconds, cancellable via the "reminders" group.
//!     let handle = scheduler.schedule(
//!         TaskRequest::after(Duration::from_secs(5), || println!("ding"))
//!             .group("reminders".to_string()),
//!     );
//!
//!     // Changed our mind: cancel the whole cohort.
//!     let cancelled = scheduler.cancel_group(&"reminders".to_string());
//!     assert_eq!(cancelled.len(), 1);
//!     assert_eq!(handle.state(), TaskState::Cancelled);
//!
//!     scheduler.stop();
//! }
//! ```

pub mod config;
pub mod error;
mod group;
pub mod prelude;
mod queue;
pub mod scheduler;
pub mod task;

// Re-export main types
pub use config::SchedulerConfig;
pub use error::RunnableFailure;
pub use scheduler::{ErrorHandler, Scheduler, SchedulerBuilder, Snapshot};
pub use task::{Tag, TaskHandle, TaskRequest, TaskState};
