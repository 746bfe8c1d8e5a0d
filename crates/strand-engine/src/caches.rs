//! `StoreGetCache` and `TreeNodesCache` (spec Section 4.4).
//!
//! Both are rebuilt wholesale on a configuration change — no incremental
//! resize — and are absent entirely when their configured size is zero.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use strand_core::types::StructureId;

/// Key into [`StoreGetCache`]: a store's structure id plus the raw key
/// bytes looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreGetKey {
    /// Structure id of the store the key was looked up in.
    pub structure_id: StructureId,
    /// Raw key bytes.
    pub key: Vec<u8>,
}

struct BoundedCache<K: std::hash::Hash + Eq + Clone, V: Clone> {
    capacity: usize,
    entries: FxHashMap<K, V>,
    order: VecDeque<K>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        let found = self.entries.get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, value);
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Cache of decoded `get` results, keyed by `(structure_id, key_bytes)`.
/// Size-capped; reports a hit rate. Absent when the configured size is
/// zero (see [`StoreGetCache::new`]).
pub struct StoreGetCache {
    inner: RwLock<BoundedCache<StoreGetKey, Vec<u8>>>,
}

impl StoreGetCache {
    /// Create a cache with the given capacity. A capacity of zero yields
    /// a cache that never stores anything (equivalent to "absent").
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(BoundedCache::new(capacity)),
        }
    }

    /// Look up a previously cached decoded value.
    pub fn get(&self, key: &StoreGetKey) -> Option<Vec<u8>> {
        self.inner.read().get(key)
    }

    /// Cache a decoded value.
    pub fn insert(&self, key: StoreGetKey, value: Vec<u8>) {
        self.inner.write().insert(key, value);
    }

    /// Current hit rate across this cache's lifetime.
    pub fn hit_rate(&self) -> f64 {
        self.inner.read().hit_rate()
    }
}

/// Cache of decoded B-tree nodes, keyed by log address. Held behind a
/// reclaimable [`Arc`] so the holder can drop its reference (and let the
/// cache be collected) under memory pressure without coordinating with
/// other readers.
pub struct TreeNodesCache {
    inner: RwLock<BoundedCache<u64, Vec<u8>>>,
}

impl TreeNodesCache {
    /// Create a cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(BoundedCache::new(capacity)),
        }
    }

    /// Look up a decoded node at `address`.
    pub fn get(&self, address: u64) -> Option<Vec<u8>> {
        self.inner.read().get(&address)
    }

    /// Cache a decoded node.
    pub fn insert(&self, address: u64, node: Vec<u8>) {
        self.inner.write().insert(address, node);
    }

    /// Current hit rate across this cache's lifetime.
    pub fn hit_rate(&self) -> f64 {
        self.inner.read().hit_rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_cache_stores_nothing() {
        let cache = StoreGetCache::new(0);
        let key = StoreGetKey {
            structure_id: StructureId(257),
            key: b"k".to_vec(),
        };
        cache.insert(key.clone(), b"v".to_vec());
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn eviction_drops_oldest_entry() {
        let cache = StoreGetCache::new(2);
        let k = |n: u8| StoreGetKey {
            structure_id: StructureId(257),
            key: vec![n],
        };
        cache.insert(k(1), vec![1]);
        cache.insert(k(2), vec![2]);
        cache.insert(k(3), vec![3]);
        assert_eq!(cache.get(&k(1)), None);
        assert_eq!(cache.get(&k(2)), Some(vec![2]));
        assert_eq!(cache.get(&k(3)), Some(vec![3]));
    }

    #[test]
    fn hit_rate_tracks_hits_and_misses() {
        let cache = StoreGetCache::new(4);
        let key = StoreGetKey {
            structure_id: StructureId(257),
            key: b"k".to_vec(),
        };
        cache.insert(key.clone(), b"v".to_vec());
        assert_eq!(cache.get(&key), Some(b"v".to_vec()));
        assert_eq!(cache.get(&StoreGetKey { structure_id: StructureId(257), key: b"missing".to_vec() }), None);
        assert_eq!(cache.hit_rate(), 0.5);
    }

    #[test]
    fn tree_nodes_cache_round_trips() {
        let cache = TreeNodesCache::new(4);
        cache.insert(10, vec![0xab]);
        assert_eq!(cache.get(10), Some(vec![0xab]));
    }
}
