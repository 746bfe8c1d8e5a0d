//! Transaction: a snapshot of the MetaTree plus pending mutations.
//!
//! A `Transaction` is mutated only by its owning thread (spec Section 3);
//! the coordinator (in `strand-engine`) drives `flush`/`commit`/`abort`/
//! `revert` against it, but the data it accumulates lives here.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Instant;
use strand_core::traits::TreeMutable;
use strand_core::types::{LogAddress, StoreName, StructureId, TreeMetaInfo};
use strand_storage::MetaTree;

/// A callback run once, synchronously, while the meta-lock is held during
/// this transaction's commit (spec Section 4.1 step 7).
pub type CommitHook = Box<dyn FnOnce() + Send>;

/// A store's tree as it looks mid-transaction: the root it was loaded
/// from plus the mutable overlay accumulating this transaction's writes.
pub struct PendingTree {
    /// Root address the base (immutable) tree was loaded from.
    pub base_root: LogAddress,
    /// Mutable overlay; `None` until the first write touches this store.
    pub overlay: Option<Box<dyn TreeMutable>>,
}

/// A transaction: either read-only or a write transaction accumulating
/// pending mutations against a MetaTree snapshot.
pub struct Transaction {
    /// Creation sequence, assigned by the coordinator. Doubles as the
    /// `TransactionSet` ordering key's tie-breaker.
    pub id: u64,
    /// MetaTree snapshot captured at begin (or at the most recent `revert`).
    pub meta_snapshot: Arc<MetaTree>,
    /// Whether this is a read-only transaction.
    pub readonly: bool,
    /// Wall-clock creation time, for metrics and timeout reporting.
    pub created_at: Instant,
    /// Creating thread, populated only when the timeout monitor is enabled.
    pub creating_thread: Option<ThreadId>,
    /// Per-store mutable overlays, keyed by structure id. Empty for a
    /// read-only transaction or a write transaction with no writes yet.
    pub pending_trees: HashMap<StructureId, PendingTree>,
    /// Stores created for the first time within this transaction, not yet
    /// visible in the committed MetaTree.
    pub new_stores: HashMap<StoreName, TreeMetaInfo>,
    /// Store names marked for removal within this transaction.
    pub removed_stores: HashSet<StoreName>,
    /// Per-store scratch maps for temporary (non-persisted) empty stores
    /// handed out under `readonlyEmptyStores` (spec Section 4.1).
    pub ephemeral_stores: HashMap<StoreName, BTreeMap<Vec<u8>, Vec<u8>>>,
    commit_hook: Option<CommitHook>,
    finished: bool,
}

impl Transaction {
    /// Begin a transaction snapshotting `meta_snapshot`.
    pub fn new(id: u64, meta_snapshot: Arc<MetaTree>, readonly: bool, track_thread: bool) -> Self {
        Self {
            id,
            meta_snapshot,
            readonly,
            created_at: Instant::now(),
            creating_thread: track_thread.then(|| std::thread::current().id()),
            pending_trees: HashMap::new(),
            new_stores: HashMap::new(),
            removed_stores: HashSet::new(),
            ephemeral_stores: HashMap::new(),
            commit_hook: None,
            finished: false,
        }
    }

    /// Register a hook to run once, synchronously, while the meta-lock is
    /// held during this transaction's commit. Replaces any hook set
    /// earlier in the same transaction.
    pub fn set_commit_hook(&mut self, hook: CommitHook) {
        self.commit_hook = Some(hook);
    }

    /// Take and clear the commit hook, if one was set.
    pub fn take_commit_hook(&mut self) -> Option<CommitHook> {
        self.commit_hook.take()
    }

    /// Whether this transaction carries no pending mutations, no store
    /// creations, and no store removals — the fast path of the commit
    /// algorithm (spec Section 4.1 step 1).
    pub fn is_idempotent(&self) -> bool {
        self.new_stores.is_empty()
            && self.removed_stores.is_empty()
            && !self
                .pending_trees
                .values()
                .any(|t| t.overlay.as_ref().is_some_and(|o| o.is_dirty()))
    }

    /// Whether `abort`/`commit` has already consumed this transaction.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mark this transaction as finished (committed or aborted). Idempotent.
    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// Re-snapshot this transaction against a fresh MetaTree, discarding
    /// all pending mutations, and assign a new creation sequence. Used by
    /// the conflict-retry loop (`executeInTransaction`) per spec Section
    /// 4.1: a transaction that loses the race re-registers under a new
    /// identity rather than being treated as the same set member.
    pub fn revert(&mut self, new_id: u64, fresh_meta: Arc<MetaTree>) {
        self.id = new_id;
        self.meta_snapshot = fresh_meta;
        self.pending_trees.clear();
        self.new_stores.clear();
        self.removed_stores.clear();
        self.ephemeral_stores.clear();
        self.commit_hook = None;
        self.created_at = Instant::now();
        self.finished = false;
    }
}
