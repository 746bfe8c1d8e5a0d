//! Persistent B-tree materialized from log records.
//!
//! Per the narrow contract the coordinator consumes (`load`, `mutable`,
//! `save`), each version of a tree is serialized as a single log record
//! holding the whole key/value map. This keeps the implementation honest
//! to the spec's externally-observed behavior without building a real
//! multi-level on-disk B-tree, which is explicitly out of scope (spec
//! Section 1).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strand_core::error::{Error, Result};
use strand_core::traits::{Log, Tree, TreeMutable};
use strand_core::types::LogAddress;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TreeData {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Immutable snapshot of a tree, as loaded from (or about to be saved to)
/// the log.
#[derive(Debug, Clone)]
pub struct LogBackedTree {
    root: LogAddress,
    data: TreeData,
}

impl LogBackedTree {
    /// A brand-new, empty tree with no root yet.
    pub fn empty() -> Self {
        Self {
            root: LogAddress::NONE,
            data: TreeData::default(),
        }
    }

    /// Load the tree snapshot stored at `root` in `log`.
    pub fn load(log: &dyn Log, root: LogAddress) -> Result<Self> {
        if root.is_none() {
            return Ok(Self::empty());
        }
        let bytes = log.read(root)?;
        let data: TreeData = bincode::deserialize(&bytes).map_err(|e| Error::Corruption {
            address: root.0,
            detail: e.to_string(),
        })?;
        Ok(Self { root, data })
    }
}

impl Tree for LogBackedTree {
    fn root_address(&self) -> LogAddress {
        self.root
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.entries.get(key).cloned()
    }

    fn len(&self) -> usize {
        self.data.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_> {
        Box::new(
            self.data
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }

    fn mutable(&self) -> Box<dyn TreeMutable> {
        Box::new(MutableTree {
            previous_root: self.root,
            data: self.data.clone(),
            dirty: false,
        })
    }
}

/// Mutable overlay produced by [`LogBackedTree::mutable`].
pub struct MutableTree {
    previous_root: LogAddress,
    data: TreeData,
    dirty: bool,
}

impl TreeMutable for MutableTree {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.data.entries.insert(key, value);
        self.dirty = true;
    }

    fn delete(&mut self, key: &[u8]) -> bool {
        let removed = self.data.entries.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.entries.get(key).cloned()
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn save(&self, log: &dyn Log) -> Result<(LogAddress, Vec<LogAddress>)> {
        let bytes = bincode::serialize(&self.data)
            .expect("TreeData serialization is infallible for owned byte maps");
        let new_root = log.append(&bytes)?;
        let expired = if self.previous_root.is_none() {
            Vec::new()
        } else {
            vec![self.previous_root]
        };
        Ok((new_root, expired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::InMemoryLog;

    #[test]
    fn empty_tree_round_trips() {
        let log = InMemoryLog::new("/tmp/x");
        let tree = LogBackedTree::empty();
        let mut mutable = tree.mutable();
        mutable.put(b"k".to_vec(), b"v".to_vec());
        let (root, expired) = mutable.save(&log).unwrap();
        assert!(expired.is_empty());
        let reloaded = LogBackedTree::load(&log, root).unwrap();
        assert_eq!(reloaded.get(b"k"), Some(b"v".to_vec()));
    }

    #[test]
    fn resave_reports_previous_root_as_expired() {
        let log = InMemoryLog::new("/tmp/x");
        let tree = LogBackedTree::empty();
        let mut m1 = tree.mutable();
        m1.put(b"a".to_vec(), b"1".to_vec());
        let (root1, _) = m1.save(&log).unwrap();

        let tree1 = LogBackedTree::load(&log, root1).unwrap();
        let mut m2 = tree1.mutable();
        m2.put(b"b".to_vec(), b"2".to_vec());
        let (root2, expired) = m2.save(&log).unwrap();

        assert_eq!(expired, vec![root1]);
        let tree2 = LogBackedTree::load(&log, root2).unwrap();
        assert_eq!(tree2.get(b"a"), Some(b"1".to_vec()));
        assert_eq!(tree2.get(b"b"), Some(b"2".to_vec()));
    }

    #[test]
    fn delete_removes_key() {
        let log = InMemoryLog::new("/tmp/x");
        let tree = LogBackedTree::empty();
        let mut m = tree.mutable();
        m.put(b"a".to_vec(), b"1".to_vec());
        assert!(m.delete(b"a"));
        assert!(!m.delete(b"a"));
        let (root, _) = m.save(&log).unwrap();
        let reloaded = LogBackedTree::load(&log, root).unwrap();
        assert!(reloaded.is_empty());
    }
}
