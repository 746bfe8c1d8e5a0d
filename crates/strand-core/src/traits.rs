//! Contracts consumed by the environment coordinator from its external
//! collaborators: the append-only log, the persistent B-tree, and the
//! garbage collector. Per spec Section 1, only these narrow surfaces are
//! in scope — everything else about how a `Log` or `GarbageCollector` is
//! implemented is an external concern.

use crate::error::Result;
use crate::types::LogAddress;
use std::path::Path;
use std::time::SystemTime;

/// Append-only record store addressed by 64-bit offsets.
///
/// The coordinator never interprets log payloads itself (that is the
/// B-tree's job); it only needs to append/read records and manage the
/// high-water mark.
pub trait Log: Send + Sync {
    /// Append `payload` as a new record and return the address it was
    /// written at.
    fn append(&self, payload: &[u8]) -> Result<LogAddress>;

    /// Read back the payload written at `address`.
    fn read(&self, address: LogAddress) -> Result<Vec<u8>>;

    /// Next free offset in the log.
    fn high_address(&self) -> u64;

    /// Force the high-water mark back to `address`, discarding any record
    /// written after it. Used to roll back a failed commit.
    fn set_high_address(&self, address: u64) -> Result<()>;

    /// Discard all records and reset to an empty log.
    fn clear(&self) -> Result<()>;

    /// Flush and release any underlying file handles.
    fn close(&self) -> Result<()>;

    /// Filesystem location backing this log, if any.
    fn location(&self) -> &Path;

    /// Creation timestamp of the log, for disk-usage / diagnostics reporting.
    fn created(&self) -> SystemTime;

    /// Read-cache hit rate, `0.0` if the log does not cache.
    fn cache_hit_rate(&self) -> f64;

    /// Forward a `log.sync.period` configuration change.
    fn set_sync_period(&self, millis: u64);

    /// Forward a `log.durable.write` configuration change.
    fn set_durable_write(&self, durable: bool);
}

/// Immutable snapshot of a persistent B-tree materialized from log records
/// at a given root address.
pub trait Tree: Send + Sync {
    /// Root address this snapshot was loaded from (`LogAddress::NONE` for
    /// a brand-new, never-saved tree).
    fn root_address(&self) -> LogAddress;

    /// Look up `key`, returning its value if present.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Whether `key` is present.
    fn contains(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries in the tree.
    fn len(&self) -> usize;

    /// Whether the tree has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate all entries in key order.
    fn iter(&self) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>;

    /// Produce a mutable copy that can accumulate writes before being saved.
    fn mutable(&self) -> Box<dyn TreeMutable>;
}

/// Mutable, not-yet-published variant of a [`Tree`], used while a write
/// transaction accumulates pending changes.
pub trait TreeMutable: Send {
    /// Insert or overwrite `key` with `value`.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Remove `key`, returning whether it was present.
    fn delete(&mut self, key: &[u8]) -> bool;

    /// Look up `key` in the current (possibly uncommitted) state.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Whether any mutation has been applied since this tree was created.
    fn is_dirty(&self) -> bool;

    /// Serialize the current state to a new log record and return the new
    /// root address plus the set of addresses made unreachable by this
    /// save (expired loggables, handed to the garbage collector).
    fn save(&self, log: &dyn Log) -> Result<(LogAddress, Vec<LogAddress>)>;
}

/// Garbage collector contract consumed by the coordinator: receives
/// expired-loggable batches on each commit and reclaims log space bounded
/// by the oldest live transaction root.
pub trait GarbageCollector: Send + Sync {
    /// Feed a batch of addresses that became unreachable after a commit.
    fn accept_expired(&self, addresses: Vec<LogAddress>);

    /// Pause reclamation (e.g. while `clear`/`close` hold the commit lock).
    fn suspend(&self);

    /// Resume reclamation after a [`GarbageCollector::suspend`].
    fn resume(&self);

    /// Nudge the collector to run a pass now, if not suspended.
    fn wake(&self);

    /// Drain and return addresses the collector has determined are safe
    /// to reclaim.
    fn fetch_expired_loggables(&self) -> Vec<LogAddress>;
}
