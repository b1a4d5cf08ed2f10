//! Group index: tag -> pending tasks, for bulk cancellation.

use crate::task::{Tag, Task};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each group tag to the pending tasks registered under it.
///
/// Buckets keep insertion order. An emptied bucket is always deleted, never
/// retained, so the set of keys is exactly the set of tags with live tasks.
pub(crate) struct GroupIndex<G> {
    buckets: HashMap<G, Vec<Arc<Task<G>>>>,
}

impl<G: Tag> GroupIndex<G> {
    pub(crate) fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    /// Register the task under each of its tags.
    pub(crate) fn add(&mut self, task: &Arc<Task<G>>) {
        for tag in task.groups() {
            self.buckets
                .entry(tag.clone())
                .or_default()
                .push(task.clone());
        }
    }

    /// Remove the task from every tag bucket it belongs to, by identity.
    /// No-op for tags or tasks not present.
    pub(crate) fn remove_task(&mut self, task: &Arc<Task<G>>) {
        for tag in task.groups() {
            let Some(bucket) = self.buckets.get_mut(tag) else {
                continue;
            };
            if let Some(i) = bucket.iter().position(|t| Arc::ptr_eq(t, task)) {
                bucket.remove(i);
            }
            if bucket.is_empty() {
                self.buckets.remove(tag);
            }
        }
    }

    /// Remove and return the full bucket for `tag`, or an empty vec if the
    /// tag is unknown.
    pub(crate) fn drain_tag(&mut self, tag: &G) -> Vec<Arc<Task<G>>> {
        self.buckets.remove(tag).unwrap_or_default()
    }

    /// Number of distinct tags with at least one pending task.
    pub(crate) fn tag_count(&self) -> usize {
        self.buckets.len()
    }

    /// Pending-task count per tag.
    pub(crate) fn counts(&self) -> HashMap<G, usize> {
        self.buckets
            .iter()
            .map(|(tag, bucket)| (tag.clone(), bucket.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    fn task(groups: &[&str]) -> Arc<Task<String>> {
        let groups = groups.iter().map(|g| g.to_string()).collect();
        Arc::new(Task::new(Instant::now(), groups, Box::new(|| {})))
    }

    #[test]
    fn test_add_registers_under_every_tag() {
        let mut index = GroupIndex::new();
        index.add(&task(&["a", "b"]));
        index.add(&task(&["b"]));

        let counts = index.counts();
        assert_eq!(counts["a"], 1);
        assert_eq!(counts["b"], 2);
        assert_eq!(index.tag_count(), 2);
    }

    #[test]
    fn test_remove_task_deletes_emptied_buckets() {
        let mut index = GroupIndex::new();
        let shared = task(&["a", "b"]);
        let other = task(&["b"]);
        index.add(&shared);
        index.add(&other);

        index.remove_task(&shared);
        assert_eq!(index.tag_count(), 1);
        assert_eq!(index.counts()["b"], 1);

        // Removing again is a no-op.
        index.remove_task(&shared);
        assert_eq!(index.tag_count(), 1);
    }

    #[test]
    fn test_drain_tag_removes_whole_bucket() {
        let mut index = GroupIndex::new();
        index.add(&task(&["a"]));
        index.add(&task(&["a"]));

        let drained = index.drain_tag(&"a".to_string());
        assert_eq!(drained.len(), 2);
        assert_eq!(index.tag_count(), 0);
    }

    #[test]
    fn test_drain_unknown_tag_is_empty() {
        let mut index: GroupIndex<String> = GroupIndex::new();
        assert!(index.drain_tag(&"missing".to_string()).is_empty());
    }

    #[test]
    fn test_buckets_keep_insertion_order() {
        let mut index = GroupIndex::new();
        let first = task(&["a"]);
        let second = task(&["a"]);
        index.add(&first);
        index.add(&second);

        let drained = index.drain_tag(&"a".to_string());
        assert!(Arc::ptr_eq(&drained[0], &first));
        assert!(Arc::ptr_eq(&drained[1], &second));
    }
}
