//! The environment coordinator (spec Section 4.1): the single owner of
//! the commit lock, the meta-lock, the structure-id counter, the caches,
//! the deferred-task queue, and the inoperative flag. Every write to the
//! log and every MetaTree swap passes through here.

use crate::caches::{StoreGetCache, StoreGetKey, TreeNodesCache};
use crate::gc::SimpleGc;
use crate::metrics::{self, EnvMetrics, Metrics};
use crate::root_pointer::RootPointer;
use crate::store::Store;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strand_concurrency::{CommitHook, DeferredTaskQueue, PendingTree, Task, Transaction, TransactionSet};
use strand_core::config::ChangedSetting;
use strand_core::error::{Error, Result};
use strand_core::traits::{GarbageCollector, Log, Tree, TreeMutable};
use strand_core::types::{LogAddress, StoreConfig, StoreName, StructureId, TreeMetaInfo};
use strand_core::EnvironmentConfig;
use strand_storage::MetaTree;
use tracing::{debug, error, info, warn};

/// Coordinates multi-version concurrent access to the stores living under
/// a single append-only log.
pub struct Environment {
    log: Arc<dyn Log>,
    root_pointer: RootPointer,
    meta_tree: RwLock<Arc<MetaTree>>,
    structure_id_counter: AtomicU32,
    txn_seq: AtomicU64,
    txn_set: TransactionSet,
    deferred: DeferredTaskQueue,
    commit_lock: Mutex<()>,
    inoperative: RwLock<Option<String>>,
    closed: AtomicBool,
    config: RwLock<EnvironmentConfig>,
    store_get_cache: RwLock<Option<Arc<StoreGetCache>>>,
    tree_nodes_cache: RwLock<Option<Arc<TreeNodesCache>>>,
    gc: Arc<dyn GarbageCollector>,
    metrics: Metrics,
    listeners: DashMap<u64, Box<dyn Fn(ChangedSetting) + Send + Sync>>,
    next_listener_id: AtomicU64,
}

fn build_store_get_cache(config: &EnvironmentConfig) -> Option<Arc<StoreGetCache>> {
    (config.store_get_cache_size > 0)
        .then(|| Arc::new(StoreGetCache::new(config.store_get_cache_size as usize)))
}

fn build_tree_nodes_cache(config: &EnvironmentConfig) -> Option<Arc<TreeNodesCache>> {
    (config.tree_nodes_cache_size > 0)
        .then(|| Arc::new(TreeNodesCache::new(config.tree_nodes_cache_size as usize)))
}

impl Environment {
    /// Open an environment against `log`, with a default [`SimpleGc`].
    pub fn open(log: Arc<dyn Log>, config: EnvironmentConfig) -> Result<Self> {
        Self::open_with_gc(log, config, Arc::new(SimpleGc::new()))
    }

    /// Open an environment against `log`, using `gc` as the garbage
    /// collector instead of the default.
    pub fn open_with_gc(
        log: Arc<dyn Log>,
        config: EnvironmentConfig,
        gc: Arc<dyn GarbageCollector>,
    ) -> Result<Self> {
        let root_pointer = RootPointer::new(log.location());
        let root = root_pointer.read()?;
        let (meta_tree, max_id) = MetaTree::load(&*log, root)?;
        let store_get_cache = build_store_get_cache(&config);
        let tree_nodes_cache = build_tree_nodes_cache(&config);
        log.set_sync_period(config.log_sync_period_ms);
        log.set_durable_write(config.log_durable_write);

        debug!(
            target: "strand::env",
            root = %root,
            max_structure_id = max_id,
            "environment opened"
        );

        Ok(Self {
            log,
            root_pointer,
            meta_tree: RwLock::new(Arc::new(meta_tree)),
            structure_id_counter: AtomicU32::new(max_id),
            txn_seq: AtomicU64::new(0),
            txn_set: TransactionSet::new(),
            deferred: DeferredTaskQueue::new(),
            commit_lock: Mutex::new(()),
            inoperative: RwLock::new(None),
            closed: AtomicBool::new(false),
            config: RwLock::new(config),
            store_get_cache: RwLock::new(store_get_cache),
            tree_nodes_cache: RwLock::new(tree_nodes_cache),
            gc,
            metrics: Metrics::new(),
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(0),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        if let Some(msg) = self.inoperative.read().clone() {
            return Err(Error::Inoperative(msg));
        }
        Ok(())
    }

    /// Whether this environment was opened readonly.
    pub fn is_readonly(&self) -> bool {
        self.config.read().readonly
    }

    fn allocate_structure_id(&self) -> StructureId {
        loop {
            let candidate = StructureId(self.structure_id_counter.fetch_add(1, Ordering::SeqCst) + 1);
            if candidate.is_valid() {
                return candidate;
            }
        }
    }

    // ---- transaction lifecycle -------------------------------------

    /// Begin a transaction. `clone_meta` is reserved for nested-transaction
    /// piggybacking (out of scope here; always takes a fresh snapshot).
    /// Returns a readonly transaction if the environment itself is readonly.
    pub fn begin_transaction(&self, clone_meta: bool, begin_hook: Option<CommitHook>) -> Result<Transaction> {
        let _ = clone_meta;
        self.ensure_open()?;
        let readonly = self.is_readonly();
        self.begin_internal(readonly, begin_hook)
    }

    /// Begin a read-only transaction regardless of the environment's own
    /// readonly flag.
    pub fn begin_readonly_transaction(&self, begin_hook: Option<CommitHook>) -> Result<Transaction> {
        self.ensure_open()?;
        self.begin_internal(true, begin_hook)
    }

    fn begin_internal(&self, readonly: bool, begin_hook: Option<CommitHook>) -> Result<Transaction> {
        let meta_snapshot = {
            let guard = self.meta_tree.read();
            if let Some(hook) = begin_hook {
                hook();
            }
            Arc::clone(&*guard)
        };
        let id = self.txn_seq.fetch_add(1, Ordering::SeqCst);
        self.txn_set.add(id, meta_snapshot.root_address());
        self.metrics.record_begin();
        let track_thread = self.config.read().transaction_timeout_ms > 0;
        debug!(target: "strand::env", txn = id, readonly, "transaction begun");
        Ok(Transaction::new(id, meta_snapshot, readonly, track_thread))
    }

    /// Run `f` to completion, retrying on conflict: `flush`, `revert`+retry
    /// on `false`, `abort` on error.
    pub fn execute_in_transaction<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Transaction) -> Result<()>,
    {
        self.compute_in_transaction(|txn| f(txn))
    }

    /// Like [`Environment::execute_in_transaction`] but returns a value
    /// computed by `f`.
    pub fn compute_in_transaction<F, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&mut Transaction) -> Result<T>,
    {
        let mut txn = self.begin_transaction(true, None)?;
        loop {
            match f(&mut txn) {
                Ok(value) => match self.flush(&mut txn) {
                    Ok(true) => {
                        self.finish_commit(&mut txn);
                        return Ok(value);
                    }
                    Ok(false) => {
                        warn!(target: "strand::env", txn = txn.id, "conflict, retrying");
                        self.revert(&mut txn)?;
                        continue;
                    }
                    Err(e) => {
                        self.abort(&mut txn);
                        return Err(e);
                    }
                },
                Err(e) => {
                    self.abort(&mut txn);
                    return Err(e);
                }
            }
        }
    }

    /// Run `f` once against a read-only transaction. No retry: a readonly
    /// transaction's flush never conflicts.
    pub fn execute_in_readonly_transaction<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Transaction) -> Result<()>,
    {
        self.compute_in_readonly_transaction(f)
    }

    /// Like [`Environment::execute_in_readonly_transaction`] but returns a
    /// value computed by `f`.
    pub fn compute_in_readonly_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction) -> Result<T>,
    {
        let mut txn = self.begin_readonly_transaction(None)?;
        match f(&mut txn) {
            Ok(value) => {
                self.flush(&mut txn).expect("readonly flush never fails");
                self.finish_commit(&mut txn);
                Ok(value)
            }
            Err(e) => {
                self.abort(&mut txn);
                Err(e)
            }
        }
    }

    /// Run the commit algorithm (spec Section 4.1 steps 1-9), without
    /// removing `txn` from the live set or draining deferred tasks. A
    /// write transaction may call this more than once before finishing.
    pub fn flush(&self, txn: &mut Transaction) -> Result<bool> {
        self.ensure_open()?;
        if txn.is_idempotent() {
            return Ok(true);
        }

        let _commit_guard = self.commit_lock.lock();
        if self.is_readonly() {
            return Err(Error::ReadonlyViolation);
        }
        if let Some(msg) = self.inoperative.read().clone() {
            return Err(Error::Inoperative(msg));
        }

        let current_root = self.meta_tree.read().root_address();
        if txn.meta_snapshot.root_address() != current_root {
            return Ok(false);
        }

        let high_address0 = self.log.high_address();
        match self.do_commit(txn) {
            Ok((new_meta, expired)) => {
                let new_root = new_meta.root_address();
                {
                    let mut guard = self.meta_tree.write();
                    *guard = Arc::new(new_meta);
                    txn.meta_snapshot = Arc::clone(&*guard);
                }
                self.txn_set.update_root(txn.id, new_root);
                if let Some(hook) = txn.take_commit_hook() {
                    hook();
                }
                drop(_commit_guard);
                self.gc.accept_expired(expired);
                info!(target: "strand::env", txn = txn.id, root = %new_root, "flushed");
                Ok(true)
            }
            Err(e) => match self.log.set_high_address(high_address0) {
                Ok(()) => {
                    warn!(target: "strand::env", txn = txn.id, error = %e, "commit failed, rolled back");
                    Err(e)
                }
                Err(rollback_err) => {
                    let original = e.to_string();
                    *self.inoperative.write() = Some(original.clone());
                    error!(
                        target: "strand::env",
                        commit_error = %e,
                        rollback_error = %rollback_err,
                        "highAddress rollback failed, environment is now inoperative"
                    );
                    Err(Error::Inoperative(original))
                }
            },
        }
    }

    /// Serialize every dirty pending tree, fold the results (plus store
    /// creations/removals) into a new MetaTree record, and persist the
    /// root pointer. Runs entirely under the commit lock; does not touch
    /// `self.meta_tree`.
    fn do_commit(&self, txn: &mut Transaction) -> Result<(MetaTree, Vec<LogAddress>)> {
        let mut expired = Vec::new();
        let mut mutable = txn.meta_snapshot.mutable();

        for name in &txn.removed_stores {
            if let Some(old_info) = txn.meta_snapshot.get_meta_info(name) {
                if !old_info.root.is_none() {
                    expired.push(old_info.root);
                }
            }
            mutable.remove(name);
        }

        for (structure_id, pending) in txn.pending_trees.iter() {
            let Some(overlay) = &pending.overlay else {
                continue;
            };
            if !overlay.is_dirty() {
                continue;
            }
            let (new_root, tree_expired) = overlay.save(&*self.log)?;
            expired.extend(tree_expired);

            if let Some(new_info) = txn
                .new_stores
                .values_mut()
                .find(|info| info.structure_id == *structure_id)
            {
                new_info.root = new_root;
            } else if let Some(name) = owner_of(&txn.meta_snapshot, *structure_id) {
                let mut info = txn
                    .meta_snapshot
                    .get_meta_info(&name)
                    .expect("name resolved from snapshot must have an info record");
                info.root = new_root;
                mutable.put(&name, info);
            }
        }

        // `remove_store` already strips its target from `new_stores`, so the
        // only way a name can appear in both maps here is `truncate_store`,
        // which means "replace": write the fresh info unconditionally.
        for (name, info) in &txn.new_stores {
            mutable.put(name, *info);
        }

        let (new_meta, meta_expired) = mutable.save(&*self.log)?;
        expired.extend(meta_expired);
        self.root_pointer.write(new_meta.root_address())?;
        Ok((new_meta, expired))
    }

    /// Flush, then remove `txn` from the live set and drain deferred
    /// tasks that are now safe to run. Returns whether the flush
    /// succeeded; a caller that gets `false` should `revert` and retry.
    pub fn commit(&self, txn: &mut Transaction) -> Result<bool> {
        match self.flush(txn) {
            Ok(true) => {
                self.finish_commit(txn);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.abort(txn);
                Err(e)
            }
        }
    }

    fn finish_commit(&self, txn: &mut Transaction) {
        self.txn_set.remove(txn.id);
        txn.mark_finished();
        self.metrics.record_commit();
        self.drain_deferred();
    }

    /// Abort `txn`: remove it from the live set, run no log writes.
    pub fn abort(&self, txn: &mut Transaction) {
        if !txn.is_finished() {
            self.txn_set.remove(txn.id);
            txn.mark_finished();
            self.metrics.record_abort();
            debug!(target: "strand::env", txn = txn.id, "aborted");
            self.drain_deferred();
        }
    }

    /// Re-snapshot `txn` against the current MetaTree, discarding its
    /// pending mutations, and re-register it under a fresh sequence (spec
    /// Section 9's Open Question resolution: a revert is a fresh
    /// `TransactionSet` member, not a special-cased identity).
    pub fn revert(&self, txn: &mut Transaction) -> Result<()> {
        self.ensure_open()?;
        self.txn_set.remove(txn.id);
        let fresh_meta = Arc::clone(&*self.meta_tree.read());
        let new_id = self.txn_seq.fetch_add(1, Ordering::SeqCst);
        self.txn_set.add(new_id, fresh_meta.root_address());
        txn.revert(new_id, fresh_meta);
        self.drain_deferred();
        Ok(())
    }

    // ---- store lifecycle --------------------------------------------

    /// Open `name` against `txn`. Consults pending store creations, then
    /// the MetaTree snapshot. Allocates a fresh structure id when creation
    /// is required and the store does not yet exist.
    pub fn open_store(
        &self,
        name: &StoreName,
        cfg: StoreConfig,
        txn: &mut Transaction,
        creation_required: bool,
    ) -> Result<Option<Store>> {
        if let Some(info) = txn.new_stores.get(name) {
            return Ok(Some(Store::from_info(name.clone(), *info)));
        }

        if let Some(info) = txn.meta_snapshot.get_meta_info(name) {
            if info.duplicates != cfg.duplicates {
                return Err(Error::ConfigMismatch {
                    name: name.to_string(),
                    detail: "duplicates flag mismatch".to_string(),
                });
            }
            let key_prefixing = cfg.prefixing && info.key_prefixing;
            return Ok(Some(Store {
                name: name.clone(),
                structure_id: info.structure_id,
                duplicates: info.duplicates,
                key_prefixing,
                ephemeral: false,
            }));
        }

        if !creation_required {
            if self.is_readonly() && self.config.read().readonly_empty_stores {
                return Ok(Some(Store::ephemeral(name.clone(), cfg.duplicates, cfg.prefixing)));
            }
            return Ok(None);
        }

        if txn.readonly {
            return Err(Error::ReadonlyViolation);
        }

        let structure_id = self.allocate_structure_id();
        let info = TreeMetaInfo {
            structure_id,
            duplicates: cfg.duplicates,
            key_prefixing: cfg.prefixing,
            root: LogAddress::NONE,
        };
        txn.new_stores.insert(name.clone(), info);
        Ok(Some(Store::from_info(name.clone(), info)))
    }

    /// Logically remove `name` and re-create it empty under a freshly
    /// allocated structure id.
    pub fn truncate_store(&self, name: &StoreName, txn: &mut Transaction) -> Result<()> {
        if txn.readonly {
            return Err(Error::ReadonlyViolation);
        }
        let existing = txn
            .new_stores
            .get(name)
            .copied()
            .or_else(|| txn.meta_snapshot.get_meta_info(name));
        let Some(existing) = existing else {
            return Err(Error::NotFound(name.to_string()));
        };
        txn.pending_trees.remove(&existing.structure_id);
        txn.removed_stores.insert(name.clone());
        let fresh = TreeMetaInfo {
            structure_id: self.allocate_structure_id(),
            duplicates: existing.duplicates,
            key_prefixing: existing.key_prefixing,
            root: LogAddress::NONE,
        };
        txn.new_stores.insert(name.clone(), fresh);
        Ok(())
    }

    /// Mark `name` for removal. Fails if unknown.
    pub fn remove_store(&self, name: &StoreName, txn: &mut Transaction) -> Result<()> {
        if txn.readonly {
            return Err(Error::ReadonlyViolation);
        }
        let structure_id = txn
            .new_stores
            .get(name)
            .map(|info| info.structure_id)
            .or_else(|| txn.meta_snapshot.get_meta_info(name).map(|info| info.structure_id));
        let Some(structure_id) = structure_id else {
            return Err(Error::NotFound(name.to_string()));
        };
        txn.new_stores.remove(name);
        txn.pending_trees.remove(&structure_id);
        txn.removed_stores.insert(name.clone());
        Ok(())
    }

    /// All store names visible to `txn`: committed names plus this
    /// transaction's pending creations, minus its pending removals.
    pub fn get_all_store_names(&self, txn: &Transaction) -> Vec<StoreName> {
        let mut names: Vec<StoreName> = txn
            .meta_snapshot
            .store_names()
            .into_iter()
            .filter(|n| !txn.removed_stores.contains(n))
            .collect();
        for name in txn.new_stores.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Whether `name` is visible to `txn`.
    pub fn store_exists(&self, name: &StoreName, txn: &Transaction) -> bool {
        if txn.removed_stores.contains(name) {
            return false;
        }
        txn.new_stores.contains_key(name) || txn.meta_snapshot.get_meta_info(name).is_some()
    }

    // ---- reads and writes against a store ----------------------------

    /// Look up `key` in `store`, honoring `txn`'s own pending writes first.
    pub fn get(&self, txn: &Transaction, store: &Store, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if store.ephemeral {
            return Ok(txn
                .ephemeral_stores
                .get(&store.name)
                .and_then(|m| m.get(key).cloned()));
        }

        if let Some(pending) = txn.pending_trees.get(&store.structure_id) {
            if let Some(overlay) = &pending.overlay {
                return Ok(overlay.get(key));
            }
        }

        let cache_key = StoreGetKey {
            structure_id: store.structure_id,
            key: key.to_vec(),
        };
        if let Some(cache) = self.store_get_cache.read().as_ref() {
            if let Some(value) = cache.get(&cache_key) {
                return Ok(Some(value));
            }
        }

        let root = self.resolve_root(txn, store);
        let tree = strand_storage::LogBackedTree::load(&*self.log, root)?;
        let value = tree.get(key);
        if let (Some(cache), Some(value)) = (self.store_get_cache.read().as_ref(), value.as_ref()) {
            cache.insert(cache_key, value.clone());
        }
        Ok(value)
    }

    /// Insert or overwrite `key` in `store` within `txn`.
    pub fn put(&self, txn: &mut Transaction, store: &Store, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if txn.readonly {
            return Err(Error::ReadonlyViolation);
        }
        if store.ephemeral {
            txn.ephemeral_stores
                .entry(store.name.clone())
                .or_default()
                .insert(key, value);
            return Ok(());
        }
        self.overlay_for(txn, store)?.put(key, value);
        Ok(())
    }

    /// Remove `key` from `store` within `txn`, returning whether it was present.
    pub fn delete(&self, txn: &mut Transaction, store: &Store, key: &[u8]) -> Result<bool> {
        if txn.readonly {
            return Err(Error::ReadonlyViolation);
        }
        if store.ephemeral {
            return Ok(txn
                .ephemeral_stores
                .get_mut(&store.name)
                .map(|m| m.remove(key).is_some())
                .unwrap_or(false));
        }
        Ok(self.overlay_for(txn, store)?.delete(key))
    }

    fn resolve_root(&self, txn: &Transaction, store: &Store) -> LogAddress {
        txn.new_stores
            .get(&store.name)
            .map(|info| info.root)
            .or_else(|| txn.meta_snapshot.get_meta_info(&store.name).map(|info| info.root))
            .unwrap_or(LogAddress::NONE)
    }

    fn overlay_for<'t>(
        &self,
        txn: &'t mut Transaction,
        store: &Store,
    ) -> Result<&'t mut Box<dyn TreeMutable>> {
        if !txn.pending_trees.contains_key(&store.structure_id) {
            let root = self.resolve_root(txn, store);
            txn.pending_trees.insert(
                store.structure_id,
                PendingTree {
                    base_root: root,
                    overlay: None,
                },
            );
        }
        let pending = txn.pending_trees.get_mut(&store.structure_id).expect("just inserted");
        if pending.overlay.is_none() {
            let base = strand_storage::LogBackedTree::load(&*self.log, pending.base_root)?;
            pending.overlay = Some(base.mutable());
        }
        Ok(pending.overlay.as_mut().expect("just populated"))
    }

    // ---- whole-environment operations --------------------------------

    /// Run `task` inline if no transaction is currently live; otherwise
    /// defer it until every transaction alive right now has finished.
    pub fn execute_transaction_safe_task(&self, task: Task) {
        match self.txn_set.newest() {
            None => task(),
            Some(newest) => self.deferred.enqueue(newest, task),
        }
    }

    fn drain_deferred(&self) {
        let oldest = self.txn_set.oldest();
        for task in self.deferred.drain_ready(oldest) {
            task();
        }
    }

    /// Suspend GC, take the commit lock, require no live transactions,
    /// clear the log, drain deferred tasks, rebuild the MetaTree, reset
    /// the structure-id counter, and resume GC.
    pub fn clear(&self) -> Result<()> {
        self.ensure_open()?;
        self.gc.suspend();
        let _commit_guard = self.commit_lock.lock();
        if !self.txn_set.is_empty() {
            self.gc.resume();
            return Err(Error::StillActive(self.txn_set.size()));
        }
        self.log.clear()?;
        self.root_pointer.write(LogAddress::NONE)?;
        for task in self.deferred.drain_ready(None) {
            task();
        }
        let (fresh_meta, max_id) = MetaTree::load(&*self.log, LogAddress::NONE)?;
        *self.meta_tree.write() = Arc::new(fresh_meta);
        self.structure_id_counter.store(max_id, Ordering::SeqCst);
        self.gc.resume();
        info!(target: "strand::env", "environment cleared");
        Ok(())
    }

    /// Close the environment. Fails with `StillActive` if transactions
    /// remain live, unless `forced`.
    pub fn close(&self, forced: bool) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.gc.suspend();
        let _commit_guard = self.commit_lock.lock();
        if !forced && !self.txn_set.is_empty() {
            self.closed.store(false, Ordering::SeqCst);
            self.gc.resume();
            return Err(Error::StillActive(self.txn_set.size()));
        }
        self.log.close()?;
        if self.inoperative.read().is_none() {
            *self.inoperative.write() = Some("environment closed".to_string());
        }
        for task in self.deferred.drain_ready(None) {
            task();
        }
        info!(target: "strand::env", forced, "environment closed");
        Ok(())
    }

    /// Whether `close` has completed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Nudge the garbage collector to run a pass now.
    pub fn gc(&self) {
        self.gc.wake();
    }

    /// Pause garbage collection.
    pub fn suspend_gc(&self) {
        self.gc.suspend();
    }

    /// Resume garbage collection after [`Environment::suspend_gc`].
    pub fn resume_gc(&self) {
        self.gc.resume();
    }

    /// Best-effort size, in bytes, of everything under the log's location.
    pub fn get_disk_usage(&self) -> Result<u64> {
        directory_size(self.log.location())
    }

    /// Current transaction metrics snapshot.
    pub fn metrics(&self) -> EnvMetrics {
        self.metrics.snapshot()
    }

    /// Block until no transaction is live, or `timeout` elapses. Returns
    /// whether the set went idle in time.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        metrics::wait_for_idle(timeout, || self.txn_set.is_empty())
    }

    // ---- configuration -------------------------------------------------

    /// Current configuration snapshot.
    pub fn config(&self) -> EnvironmentConfig {
        self.config.read().clone()
    }

    /// Apply a configuration change, rebuilding affected caches and
    /// forwarding log-level settings, then dispatch to subscribers
    /// synchronously. Handlers must not take the commit lock.
    pub fn apply_config_change(&self, change: ChangedSetting) {
        {
            let mut config = self.config.write();
            match change {
                ChangedSetting::StoreGetCacheSize(size) => config.store_get_cache_size = size,
                ChangedSetting::TreeNodesCacheSize(size) => config.tree_nodes_cache_size = size,
                ChangedSetting::LogSyncPeriodMs(ms) => config.log_sync_period_ms = ms,
                ChangedSetting::LogDurableWrite(durable) => config.log_durable_write = durable,
                ChangedSetting::Readonly(readonly) => config.readonly = readonly,
            }
        }
        match change {
            ChangedSetting::StoreGetCacheSize(_) => {
                *self.store_get_cache.write() = build_store_get_cache(&self.config.read());
            }
            ChangedSetting::TreeNodesCacheSize(_) => {
                *self.tree_nodes_cache.write() = build_tree_nodes_cache(&self.config.read());
            }
            ChangedSetting::LogSyncPeriodMs(ms) => self.log.set_sync_period(ms),
            ChangedSetting::LogDurableWrite(durable) => self.log.set_durable_write(durable),
            ChangedSetting::Readonly(readonly) => {
                if readonly {
                    self.gc.suspend();
                } else {
                    self.gc.resume();
                }
            }
        }
        for listener in self.listeners.iter() {
            listener.value()(change);
        }
    }

    /// Subscribe to configuration-change notifications. Returns a token
    /// for [`Environment::unsubscribe`].
    pub fn subscribe(&self, listener: Box<dyn Fn(ChangedSetting) + Send + Sync>) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.insert(id, listener);
        id
    }

    /// Remove a subscription registered with [`Environment::subscribe`].
    pub fn unsubscribe(&self, token: u64) {
        self.listeners.remove(&token);
    }
}

fn owner_of(meta: &MetaTree, structure_id: StructureId) -> Option<StoreName> {
    meta.store_names().into_iter().find(|name| {
        meta.get_meta_info(name)
            .map(|info| info.structure_id == structure_id)
            .unwrap_or(false)
    })
}

fn directory_size(path: &std::path::Path) -> Result<u64> {
    let mut total = 0u64;
    if path.is_file() {
        return Ok(path.metadata()?.len());
    }
    if !path.is_dir() {
        return Ok(0);
    }
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            total += directory_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}
