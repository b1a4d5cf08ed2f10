//! Ordered queue of pending tasks, keyed by due time.

use crate::task::Task;
use std::sync::Arc;
use tokio::time::Instant;

/// An array-backed sequence of pending tasks, sorted by due time ascending.
///
/// Ties at equal due times break by insertion order (FIFO). Pending sets are
/// small in practice, so a linear scan on insert and remove is acceptable;
/// the sort invariant makes draining due tasks a prefix operation.
pub(crate) struct DueQueue<G> {
    tasks: Vec<Arc<Task<G>>>,
}

impl<G> DueQueue<G> {
    pub(crate) fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Insert before the first task with a strictly greater due time,
    /// preserving FIFO order among equal due times. Single forward pass.
    pub(crate) fn insert(&mut self, task: Arc<Task<G>>) {
        match self.tasks.iter().position(|t| t.due_at() > task.due_at()) {
            Some(i) => self.tasks.insert(i, task),
            None => self.tasks.push(task),
        }
    }

    /// Remove a task by identity. No-op if absent.
    pub(crate) fn remove(&mut self, task: &Arc<Task<G>>) {
        if let Some(i) = self.tasks.iter().position(|t| Arc::ptr_eq(t, task)) {
            self.tasks.remove(i);
        }
    }

    /// Remove and return every task due at or before `now`, in ascending
    /// `(due time, insertion order)`.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Vec<Arc<Task<G>>> {
        let due = self.tasks.iter().take_while(|t| t.due_at() <= now).count();
        self.tasks.drain(..due).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn task(due_at: Instant, label: &str) -> Arc<Task<String>> {
        Arc::new(Task::new(due_at, vec![label.to_string()], Box::new(|| {})))
    }

    fn labels(tasks: &[Arc<Task<String>>]) -> Vec<String> {
        tasks.iter().map(|t| t.groups()[0].clone()).collect()
    }

    #[test]
    fn test_insert_keeps_sorted_order() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task(now + Duration::from_secs(3), "c"));
        queue.insert(task(now + Duration::from_secs(1), "a"));
        queue.insert(task(now + Duration::from_secs(2), "b"));

        let all = queue.pop_due(now + Duration::from_secs(10));
        assert_eq!(labels(&all), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_equal_due_times_are_fifo() {
        let due = Instant::now() + Duration::from_secs(1);
        let mut queue = DueQueue::new();
        queue.insert(task(due, "first"));
        queue.insert(task(due, "second"));
        queue.insert(task(due, "third"));

        let all = queue.pop_due(due);
        assert_eq!(labels(&all), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_pop_due_stops_at_future_tasks() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task(now + Duration::from_secs(1), "due"));
        queue.insert(task(now + Duration::from_secs(60), "future"));

        let due = queue.pop_due(now + Duration::from_secs(2));
        assert_eq!(labels(&due), vec!["due"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_due_on_empty_queue() {
        let mut queue: DueQueue<String> = DueQueue::new();
        assert!(queue.pop_due(Instant::now()).is_empty());
    }

    #[test]
    fn test_remove_by_identity() {
        let now = Instant::now();
        let target = task(now + Duration::from_secs(2), "target");
        let mut queue = DueQueue::new();
        queue.insert(task(now + Duration::from_secs(1), "other"));
        queue.insert(target.clone());

        queue.remove(&target);
        assert_eq!(queue.len(), 1);

        // Removing an absent task is a no-op.
        queue.remove(&target);
        assert_eq!(queue.len(), 1);
    }
}
