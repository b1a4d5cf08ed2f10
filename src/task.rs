//! Task records, requests, and caller-facing handles.

use crate::scheduler::Shared;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::Instant;

/// Bounds required of a group tag type.
///
/// Tags are opaque to the scheduler: any cheaply cloneable, hashable key type
/// works. Automatically implemented for every type satisfying the bounds.
pub trait Tag: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> Tag for T {}

/// A scheduled unit of work: a zero-argument callable, run once.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle state of a scheduled task.
///
/// Transitions are one-way and idempotent: once a task is
/// [`RunningOrDone`](TaskState::RunningOrDone) or
/// [`Cancelled`](TaskState::Cancelled), further run or cancel requests are
/// no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Registered, not yet dispatched or cancelled.
    Pending,
    /// Dispatched; the runnable has been launched (or already finished).
    RunningOrDone,
    /// Cancelled before dispatch; the runnable will never run.
    Cancelled,
}

const STATE_PENDING: u8 = 0;
const STATE_RUNNING_OR_DONE: u8 = 1;
const STATE_CANCELLED: u8 = 2;

/// Internal task record.
///
/// Immutable after creation apart from the state flag and the one-shot
/// runnable slot. The task's `Arc` identity doubles as its handle into the
/// due queue and group index.
pub(crate) struct Task<G> {
    due_at: Instant,
    groups: Vec<G>,
    job: Mutex<Option<Job>>,
    state: AtomicU8,
}

impl<G> Task<G> {
    pub(crate) fn new(due_at: Instant, groups: Vec<G>, job: Job) -> Self {
        Self {
            due_at,
            groups,
            job: Mutex::new(Some(job)),
            state: AtomicU8::new(STATE_PENDING),
        }
    }

    pub(crate) fn due_at(&self) -> Instant {
        self.due_at
    }

    pub(crate) fn groups(&self) -> &[G] {
        &self.groups
    }

    pub(crate) fn state(&self) -> TaskState {
        match self.state.load(Ordering::Acquire) {
            STATE_PENDING => TaskState::Pending,
            STATE_RUNNING_OR_DONE => TaskState::RunningOrDone,
            _ => TaskState::Cancelled,
        }
    }

    /// Transition Pending -> RunningOrDone. Returns false if the task was
    /// already dispatched or cancelled.
    pub(crate) fn mark_running(&self) -> bool {
        self.state
            .compare_exchange(
                STATE_PENDING,
                STATE_RUNNING_OR_DONE,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Transition Pending -> Cancelled. Returns false if the task was already
    /// dispatched or cancelled.
    pub(crate) fn mark_cancelled(&self) -> bool {
        self.state
            .compare_exchange(
                STATE_PENDING,
                STATE_CANCELLED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Consume the runnable. Yields `Some` exactly once.
    pub(crate) fn take_job(&self) -> Option<Job> {
        self.job.lock().take()
    }
}

/// A request to schedule a task: a due instant, zero or more group tags, and
/// the runnable itself.
///
/// # Example
///
/// ```ignore
/// let request = TaskRequest::after(Duration::from_secs(5), || notify_user())
///     .group("reminders".to_string())
///     .group("user:42".to_string());
/// scheduler.schedule(request);
/// ```
pub struct TaskRequest<G> {
    pub(crate) due_at: Instant,
    pub(crate) groups: Vec<G>,
    pub(crate) job: Job,
}

impl<G> TaskRequest<G> {
    /// Run `job` at (or as soon as possible after) `due_at`.
    pub fn at(due_at: Instant, job: impl FnOnce() + Send + 'static) -> Self {
        Self {
            due_at,
            groups: Vec::new(),
            job: Box::new(job),
        }
    }

    /// Run `job` once `delay` has elapsed from now.
    pub fn after(delay: Duration, job: impl FnOnce() + Send + 'static) -> Self {
        Self::at(Instant::now() + delay, job)
    }

    /// Tag the task with a group, enabling bulk cancellation via
    /// [`Scheduler::cancel_group`](crate::Scheduler::cancel_group).
    pub fn group(mut self, tag: G) -> Self {
        self.groups.push(tag);
        self
    }

    /// Tag the task with several groups at once.
    pub fn groups(mut self, tags: impl IntoIterator<Item = G>) -> Self {
        self.groups.extend(tags);
        self
    }
}

/// Caller-facing handle to a scheduled task.
///
/// Returned by [`Scheduler::schedule`](crate::Scheduler::schedule). Holds a
/// back-reference to the scheduler so the task can be cancelled from any
/// context; cloning the handle does not clone the task.
pub struct TaskHandle<G> {
    task: Arc<Task<G>>,
    scheduler: Weak<Shared<G>>,
}

impl<G> Clone for TaskHandle<G> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<G> fmt::Debug for TaskHandle<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("due_at", &self.task.due_at())
            .field("state", &self.task.state())
            .finish()
    }
}

impl<G: Tag> TaskHandle<G> {
    pub(crate) fn new(task: Arc<Task<G>>, scheduler: Weak<Shared<G>>) -> Self {
        Self { task, scheduler }
    }

    /// The instant at or after which the task becomes eligible to run.
    pub fn due_at(&self) -> Instant {
        self.task.due_at()
    }

    /// The group tags the task was scheduled under.
    pub fn groups(&self) -> &[G] {
        self.task.groups()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.task.state()
    }

    /// Whether the due time has already passed.
    pub fn is_expired(&self) -> bool {
        self.task.due_at() <= Instant::now()
    }

    /// Cancel the task.
    ///
    /// Returns `true` if this call performed the cancellation. Safe to call
    /// multiple times and from any context; once the task has been dispatched
    /// this is a no-op (a launched runnable cannot be aborted).
    pub fn cancel(&self) -> bool {
        match self.scheduler.upgrade() {
            Some(shared) => shared.cancel_task(&self.task),
            // Scheduler is gone; nothing to unlink, just flip the flag.
            None => self.task.mark_cancelled(),
        }
    }
}
