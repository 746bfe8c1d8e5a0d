//! Default garbage collector.
//!
//! The garbage collector is an external collaborator per spec Section 1:
//! the coordinator only ever calls `accept_expired`/`suspend`/`resume`/
//! `wake`/`fetch_expired_loggables`. This module ships one minimal,
//! concrete backend — a suspendable FIFO queue of expired addresses —
//! grounded in the teacher's pattern of one trait with several
//! interchangeable backends (`Durability` / `InMemory` / `Buffered` /
//! `Strict`). Anything resembling utilization-tracked reclamation policy
//! is out of scope (spec Section 1) and is not built here.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use strand_core::traits::GarbageCollector;
use strand_core::types::LogAddress;
use tracing::debug;

/// A minimal garbage collector: a suspendable queue of addresses that
/// have become unreachable. Reclamation itself (actually compacting the
/// log) is outside this crate's scope; this type only tracks which
/// addresses are eligible.
#[derive(Default)]
pub struct SimpleGc {
    queue: Mutex<VecDeque<LogAddress>>,
    suspended: AtomicBool,
}

impl SimpleGc {
    /// A collector with an empty queue, not suspended.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addresses currently queued for reclamation.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether reclamation is currently suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }
}

impl GarbageCollector for SimpleGc {
    fn accept_expired(&self, addresses: Vec<LogAddress>) {
        if addresses.is_empty() {
            return;
        }
        debug!(target: "strand::gc", count = addresses.len(), "accepted expired loggables");
        self.queue.lock().extend(addresses);
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    fn wake(&self) {
        // A fuller implementation would nudge a background compaction
        // thread here; this backend reclaims lazily via
        // `fetch_expired_loggables` instead.
    }

    fn fetch_expired_loggables(&self) -> Vec<LogAddress> {
        if self.is_suspended() {
            return Vec::new();
        }
        self.queue.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_gc_withholds_addresses() {
        let gc = SimpleGc::new();
        gc.accept_expired(vec![LogAddress(1), LogAddress(2)]);
        gc.suspend();
        assert!(gc.fetch_expired_loggables().is_empty());
        gc.resume();
        let fetched = gc.fetch_expired_loggables();
        assert_eq!(fetched, vec![LogAddress(1), LogAddress(2)]);
    }

    #[test]
    fn fetch_drains_queue() {
        let gc = SimpleGc::new();
        gc.accept_expired(vec![LogAddress(7)]);
        assert_eq!(gc.pending_count(), 1);
        let fetched = gc.fetch_expired_loggables();
        assert_eq!(fetched, vec![LogAddress(7)]);
        assert_eq!(gc.pending_count(), 0);
    }
}
