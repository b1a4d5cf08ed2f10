//! Main scheduler implementation: tick loop, dispatch, bulk cancellation.

use crate::config::SchedulerConfig;
use crate::error::RunnableFailure;
use crate::group::GroupIndex;
use crate::queue::DueQueue;
use crate::task::{Tag, Task, TaskHandle, TaskRequest};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Sink for failures raised inside dispatched runnables.
pub type ErrorHandler = Arc<dyn Fn(RunnableFailure) + Send + Sync>;

/// In-process delayed-execution scheduler.
///
/// Tasks are held in a due-time-ordered queue and a group index, both guarded
/// by a single lock so every operation sees them as one consistent unit. A
/// background tick task drains due work each interval and launches each
/// runnable on its own tokio task, so a slow runnable never delays the loop.
///
/// The scheduler is a cheap handle: clones share the same state, and the
/// background loop stops when the last clone is dropped.
///
/// Must be used from within a tokio runtime.
pub struct Scheduler<G> {
    shared: Arc<Shared<G>>,
}

impl<G> Clone for Scheduler<G> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<G: Tag> Scheduler<G> {
    /// Create a scheduler with the default configuration (1s tick).
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a scheduler with an explicit configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: RwLock::new(State {
                    queue: DueQueue::new(),
                    groups: GroupIndex::new(),
                    running: false,
                    ticker: None,
                    error_handler: None,
                }),
            }),
        }
    }

    /// Create a new scheduler builder.
    pub fn builder() -> SchedulerBuilder<G> {
        SchedulerBuilder::new()
    }

    /// Register a task.
    ///
    /// A task whose due time is at or before the current instant bypasses the
    /// queue entirely and is dispatched immediately; everything else waits for
    /// the tick at or after its due time. Never fails.
    pub fn schedule(&self, request: TaskRequest<G>) -> TaskHandle<G> {
        let TaskRequest {
            due_at,
            groups,
            job,
        } = request;
        let task = Arc::new(Task::new(due_at, groups, job));

        let mut state = self.shared.state.write();
        let now = Instant::now();
        if due_at <= now {
            debug!(groups = ?task.groups(), "task already due, dispatching immediately");
            if task.mark_running() {
                Shared::dispatch(&task, state.error_handler.clone());
            }
        } else {
            state.queue.insert(task.clone());
            state.groups.add(&task);
            debug!(
                due_in = ?due_at.duration_since(now),
                groups = ?task.groups(),
                pending = state.queue.len(),
                "task scheduled"
            );
        }
        drop(state);

        TaskHandle::new(task, Arc::downgrade(&self.shared))
    }

    /// Cancel every pending task registered under `tag`.
    ///
    /// Cancellation is task-global: each drained task is also removed from
    /// every other group it belongs to. Returns handles to the cancelled
    /// tasks (empty for an unknown tag). By the time this returns, none of
    /// them can fire.
    pub fn cancel_group(&self, tag: &G) -> Vec<TaskHandle<G>> {
        let mut state = self.shared.state.write();
        let drained = state.groups.drain_tag(tag);
        for task in &drained {
            if task.mark_cancelled() {
                state.queue.remove(task);
                state.groups.remove_task(task);
            }
        }
        drop(state);

        if !drained.is_empty() {
            debug!(?tag, cancelled = drained.len(), "group cancelled");
        }
        drained
            .into_iter()
            .map(|task| TaskHandle::new(task, Arc::downgrade(&self.shared)))
            .collect()
    }

    /// Register the error handler receiving [`RunnableFailure`] values.
    ///
    /// Replaces any previous handler; takes effect for subsequently
    /// dispatched runnables, not retroactively.
    pub fn set_error_handler(&self, handler: impl Fn(RunnableFailure) + Send + Sync + 'static) {
        self.shared.state.write().error_handler = Some(Arc::new(handler));
    }

    /// Start the background tick loop. No-op if already running.
    pub fn start(&self) {
        let mut state = self.shared.state.write();
        if state.running {
            return;
        }
        state.running = true;

        let tick = self.shared.config.tick_interval;
        // The loop holds only a weak reference so dropping the last scheduler
        // handle tears it down rather than leaking it.
        let shared = Arc::downgrade(&self.shared);
        state.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                shared.tick();
            }
        }));
        drop(state);

        info!(interval = ?tick, "scheduler started");
    }

    /// Stop the background tick loop. No-op if already stopped.
    ///
    /// Pending tasks are neither run nor dropped; they stop being serviced
    /// until [`start`](Self::start) is called again. Inspect via
    /// [`snapshot`](Self::snapshot) before stopping if cleanup is desired.
    pub fn stop(&self) {
        let mut state = self.shared.state.write();
        if !state.running {
            return;
        }
        state.running = false;
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
        drop(state);

        info!("scheduler stopped");
    }

    /// Whether the tick loop is currently running.
    pub fn is_running(&self) -> bool {
        self.shared.state.read().running
    }

    /// Diagnostic counters over the pending set.
    pub fn snapshot(&self) -> Snapshot<G> {
        let state = self.shared.state.read();
        Snapshot {
            group_count: state.groups.tag_count(),
            group_counts: state.groups.counts(),
            pending_tasks: state.queue.len(),
        }
    }
}

impl<G: Tag> Default for Scheduler<G> {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between scheduler handles, task handles, and the tick loop.
pub(crate) struct Shared<G> {
    config: SchedulerConfig,
    state: RwLock<State<G>>,
}

/// The two collections plus lifecycle, mutated only as a unit under the lock.
struct State<G> {
    queue: DueQueue<G>,
    groups: GroupIndex<G>,
    running: bool,
    ticker: Option<JoinHandle<()>>,
    error_handler: Option<ErrorHandler>,
}

impl<G: Tag> Shared<G> {
    /// One firing of the tick loop: drain due tasks and launch them in
    /// ascending `(due time, insertion order)`.
    fn tick(&self) {
        let mut state = self.state.write();
        if !state.running {
            // Lost a race with stop(); the aborted loop may still fire once.
            return;
        }

        let due = state.queue.pop_due(Instant::now());
        if due.is_empty() {
            return;
        }
        debug!(count = due.len(), "dispatching due tasks");

        let handler = state.error_handler.clone();
        for task in due {
            state.groups.remove_task(&task);
            if task.mark_running() {
                Shared::dispatch(&task, handler.clone());
            }
        }
    }

    /// Cancel a single task, unlinking it from both collections.
    pub(crate) fn cancel_task(&self, task: &Arc<Task<G>>) -> bool {
        let mut state = self.state.write();
        if !task.mark_cancelled() {
            return false;
        }
        state.queue.remove(task);
        state.groups.remove_task(task);
        true
    }

    /// Launch a runnable on its own execution path with failure isolation.
    ///
    /// The task is already marked RunningOrDone by the caller; the runnable
    /// itself executes on the blocking pool, after the scheduler lock is
    /// released, so it can block indefinitely without stalling the tick loop.
    /// A panic inside it is captured and forwarded to the error handler.
    fn dispatch(task: &Arc<Task<G>>, handler: Option<ErrorHandler>) {
        let Some(job) = task.take_job() else {
            return;
        };
        tokio::spawn(async move {
            match tokio::task::spawn_blocking(job).await {
                Ok(()) => {}
                Err(err) if err.is_panic() => {
                    let failure = RunnableFailure::from_panic(err.into_panic());
                    match handler {
                        Some(handler) => handler(failure),
                        None => {
                            error!(%failure, "runnable panicked with no error handler registered");
                        }
                    }
                }
                // Runtime shutting down; the runnable never started.
                Err(_) => {}
            }
        });
    }
}

impl<G> Drop for Shared<G> {
    fn drop(&mut self) {
        if let Some(ticker) = self.state.get_mut().ticker.take() {
            ticker.abort();
        }
    }
}

/// Diagnostic counters returned by [`Scheduler::snapshot`].
#[derive(Debug, Clone)]
pub struct Snapshot<G> {
    /// Number of distinct group tags with pending tasks.
    pub group_count: usize,
    /// Pending-task count per group tag.
    pub group_counts: HashMap<G, usize>,
    /// Total number of pending tasks.
    pub pending_tasks: usize,
}

/// Builder for creating a scheduler.
pub struct SchedulerBuilder<G> {
    config: SchedulerConfig,
    error_handler: Option<ErrorHandler>,
    _tag: PhantomData<G>,
}

impl<G: Tag> SchedulerBuilder<G> {
    /// Create a new scheduler builder.
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            error_handler: None,
            _tag: PhantomData,
        }
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_tick_interval(interval);
        self
    }

    /// Register the error handler up front.
    pub fn with_error_handler(
        mut self,
        handler: impl Fn(RunnableFailure) + Send + Sync + 'static,
    ) -> Self {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Build the scheduler. The tick loop is not started; call
    /// [`Scheduler::start`] when ready.
    pub fn build(self) -> Scheduler<G> {
        let scheduler = Scheduler::with_config(self.config);
        if let Some(handler) = self.error_handler {
            scheduler.shared.state.write().error_handler = Some(handler);
        }
        scheduler
    }
}

impl<G: Tag> Default for SchedulerBuilder<G> {
    fn default() -> Self {
        Self::new()
    }
}
