//! Transaction metrics, grounded in the teacher's `TransactionMetrics`
//! (`coordinator.rs`): plain `Relaxed` atomic counters, purely
//! observational — nothing here feeds back into commit-path decisions.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Point-in-time snapshot of [`Metrics`], returned by `Environment::metrics`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvMetrics {
    /// Transactions currently live.
    pub active_count: usize,
    /// Transactions begun since construction.
    pub total_started: u64,
    /// Transactions successfully committed since construction.
    pub total_committed: u64,
    /// Transactions aborted (including conflict-retries) since construction.
    pub total_aborted: u64,
}

impl EnvMetrics {
    /// Fraction of started transactions that committed, `0.0` if none started.
    pub fn commit_rate(&self) -> f64 {
        if self.total_started == 0 {
            0.0
        } else {
            self.total_committed as f64 / self.total_started as f64
        }
    }

    /// Fraction of started transactions that aborted, `0.0` if none started.
    pub fn abort_rate(&self) -> f64 {
        if self.total_started == 0 {
            0.0
        } else {
            self.total_aborted as f64 / self.total_started as f64
        }
    }
}

/// Live counters backing [`EnvMetrics`]. All updates are `Relaxed`: these
/// numbers are for dashboards, never for correctness decisions.
#[derive(Default)]
pub struct Metrics {
    active_count: AtomicUsize,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
}

impl Metrics {
    /// A fresh, all-zero counter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transaction beginning.
    pub fn record_begin(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transaction committing.
    pub fn record_commit(&self) {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transaction aborting (including a conflict that will retry
    /// under a fresh identity).
    pub fn record_abort(&self) {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> EnvMetrics {
        EnvMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: self.total_started.load(Ordering::Relaxed),
            total_committed: self.total_committed.load(Ordering::Relaxed),
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
        }
    }
}

/// Spin with short sleeps until `is_idle` reports no live transactions or
/// `timeout` elapses. Returns whether the set went idle in time.
pub fn wait_for_idle(timeout: Duration, is_idle: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if is_idle() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_and_abort_rates() {
        let m = Metrics::new();
        m.record_begin();
        m.record_begin();
        m.record_commit();
        m.record_begin();
        m.record_abort();
        let snap = m.snapshot();
        assert_eq!(snap.active_count, 1);
        assert_eq!(snap.total_started, 3);
        assert_eq!(snap.commit_rate(), 1.0 / 3.0);
        assert_eq!(snap.abort_rate(), 1.0 / 3.0);
    }

    #[test]
    fn wait_for_idle_times_out() {
        let went_idle = wait_for_idle(Duration::from_millis(20), || false);
        assert!(!went_idle);
    }

    #[test]
    fn wait_for_idle_detects_immediate_idle() {
        assert!(wait_for_idle(Duration::from_millis(20), || true));
    }
}
