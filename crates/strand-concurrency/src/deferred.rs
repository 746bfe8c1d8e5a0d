//! Transaction-safe deferred task queue (spec Section 3, "DeferredTask").
//!
//! A task is stamped with the **newest** live root at enqueue time, so it
//! is deferred past every currently-live reader; it drains once the
//! **oldest** live root exceeds that stamp (spec Section 9, "Deferred-task
//! queue with root timestamps"). Tasks are stored in a structure keyed by
//! stamp, as the design note recommends, so a drain is a single range-pop
//! rather than a linear scan.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use strand_core::types::LogAddress;

/// A callback deferred until every transaction alive at enqueue time has
/// finished.
pub type Task = Box<dyn FnOnce() + Send>;

/// Queue of transaction-safe deferred tasks, keyed by the root address
/// stamp they were enqueued with.
#[derive(Default)]
pub struct DeferredTaskQueue {
    by_stamp: Mutex<BTreeMap<u64, Vec<Task>>>,
}

impl DeferredTaskQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `task`, stamped with `newest_live_root` (the newest root
    /// among currently live transactions at enqueue time).
    pub fn enqueue(&self, newest_live_root: LogAddress, task: Task) {
        self.by_stamp
            .lock()
            .entry(newest_live_root.0)
            .or_default()
            .push(task);
    }

    /// Whether the queue currently holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.by_stamp.lock().is_empty()
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.by_stamp.lock().values().map(Vec::len).sum()
    }

    /// Remove and return every task whose stamp is strictly less than
    /// `oldest_live_root` (or every task, if `oldest_live_root` is
    /// `None`, meaning no transaction is currently live). The caller runs
    /// the returned tasks outside of any lock.
    pub fn drain_ready(&self, oldest_live_root: Option<LogAddress>) -> Vec<Task> {
        let mut guard = self.by_stamp.lock();
        let ready_stamps: Vec<u64> = match oldest_live_root {
            None => guard.keys().copied().collect(),
            Some(oldest) => guard.range(..oldest.0).map(|(k, _)| *k).collect(),
        };
        let mut ready = Vec::new();
        for stamp in ready_stamps {
            if let Some(tasks) = guard.remove(&stamp) {
                ready.extend(tasks);
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn task_withheld_while_root_is_still_newest_live() {
        let queue = DeferredTaskQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        queue.enqueue(LogAddress(10), Box::new(move || { ran2.fetch_add(1, Ordering::SeqCst); }));

        // Oldest live root is still <= stamp: not ready.
        let ready = queue.drain_ready(Some(LogAddress(10)));
        assert!(ready.is_empty());
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        // Oldest live root has advanced past the stamp: ready.
        let ready = queue.drain_ready(Some(LogAddress(11)));
        assert_eq!(ready.len(), 1);
        for task in ready {
            task();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_live_transactions_drains_everything() {
        let queue = DeferredTaskQueue::new();
        queue.enqueue(LogAddress(5), Box::new(|| {}));
        queue.enqueue(LogAddress(50), Box::new(|| {}));
        let ready = queue.drain_ready(None);
        assert_eq!(ready.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn runs_exactly_once() {
        let queue = DeferredTaskQueue::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        queue.enqueue(LogAddress(1), Box::new(move || { c.fetch_add(1, Ordering::SeqCst); }));

        let first = queue.drain_ready(None);
        assert_eq!(first.len(), 1);
        let second = queue.drain_ready(None);
        assert!(second.is_empty());

        for task in first {
            task();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
