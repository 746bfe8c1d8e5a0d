//! The live set of begun-but-not-finished transactions, ordered by
//! creation (spec Section 4.3).

use parking_lot::Mutex;
use std::collections::BTreeMap;
use strand_core::types::LogAddress;

/// A concurrent ordered set of live transactions, keyed by creation
/// sequence. Tolerates re-insertion of a transaction identity that was
/// previously removed (a `revert` followed by re-registration under a
/// fresh sequence) — see the Open Question resolution in DESIGN.md.
#[derive(Default)]
pub struct TransactionSet {
    // sequence -> snapshot root, ordered by insertion (= creation order).
    members: Mutex<BTreeMap<u64, LogAddress>>,
}

impl TransactionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transaction with creation sequence `id` and snapshot
    /// root `root`.
    pub fn add(&self, id: u64, root: LogAddress) {
        self.members.lock().insert(id, root);
    }

    /// Remove the transaction with creation sequence `id`. Returns
    /// whether it was present.
    pub fn remove(&self, id: u64) -> bool {
        self.members.lock().remove(&id).is_some()
    }

    /// Advance the recorded root for the still-live transaction `id` (a
    /// write transaction that flushed without finishing keeps its
    /// identity but now observes a newer snapshot).
    pub fn update_root(&self, id: u64, new_root: LogAddress) {
        if let Some(root) = self.members.lock().get_mut(&id) {
            *root = new_root;
        }
    }

    /// Whether a transaction with creation sequence `id` is live.
    pub fn contains(&self, id: u64) -> bool {
        self.members.lock().contains_key(&id)
    }

    /// Number of live transactions.
    pub fn size(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether there are no live transactions.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The oldest (lowest creation sequence) live transaction's snapshot
    /// root, if any are live.
    pub fn oldest(&self) -> Option<LogAddress> {
        self.members.lock().iter().next().map(|(_, root)| *root)
    }

    /// The newest (highest creation sequence) live transaction's snapshot
    /// root, if any are live.
    pub fn newest(&self) -> Option<LogAddress> {
        self.members.lock().iter().next_back().map(|(_, root)| *root)
    }

    /// Snapshot the current membership as `(sequence, root)` pairs, in
    /// creation order.
    pub fn snapshot(&self) -> Vec<(u64, LogAddress)> {
        self.members.lock().iter().map(|(k, v)| (*k, *v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_and_newest_track_insertion_order() {
        let set = TransactionSet::new();
        assert!(set.oldest().is_none());
        set.add(1, LogAddress(10));
        set.add(2, LogAddress(20));
        set.add(3, LogAddress(30));
        assert_eq!(set.oldest(), Some(LogAddress(10)));
        assert_eq!(set.newest(), Some(LogAddress(30)));
        set.remove(1);
        assert_eq!(set.oldest(), Some(LogAddress(20)));
    }

    #[test]
    fn reinsertion_after_revert_uses_fresh_sequence() {
        let set = TransactionSet::new();
        set.add(1, LogAddress(10));
        set.remove(1);
        // revert assigns a new id; re-adding under that id is just a
        // fresh member, not special-cased identity.
        set.add(2, LogAddress(20));
        assert_eq!(set.size(), 1);
        assert_eq!(set.oldest(), Some(LogAddress(20)));
    }

    #[test]
    fn empty_set_has_no_oldest_or_newest() {
        let set = TransactionSet::new();
        assert!(set.oldest().is_none());
        assert!(set.newest().is_none());
        assert!(set.is_empty());
    }
}
