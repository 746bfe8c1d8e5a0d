//! The MetaTree: a distinguished [`LogBackedTree`] (structure id `1`)
//! mapping store names to [`TreeMetaInfo`] records. Every committed
//! version of the environment corresponds to exactly one MetaTree root
//! address (spec Section 2).

use crate::tree::LogBackedTree;
use std::collections::HashMap;
use strand_core::error::{Error, Result};
use strand_core::traits::{Log, Tree, TreeMutable};
use strand_core::types::{LogAddress, StoreName, StructureId, TreeMetaInfo};

/// Immutable snapshot of the name → `TreeMetaInfo` mapping.
#[derive(Debug, Clone)]
pub struct MetaTree {
    tree: LogBackedTree,
}

impl MetaTree {
    /// Root address this snapshot was loaded from.
    pub fn root_address(&self) -> LogAddress {
        self.tree.root_address()
    }

    /// Load the MetaTree rooted at `root` (use `LogAddress::NONE` for a
    /// brand-new environment). Returns the tree plus the maximum
    /// structure id observed, used to seed the coordinator's counter.
    pub fn load(log: &dyn Log, root: LogAddress) -> Result<(MetaTree, u32)> {
        let tree = LogBackedTree::load(log, root)?;
        let mut max_id = StructureId::META_TREE.0;
        for (_, value) in tree.iter() {
            let info: TreeMetaInfo =
                bincode::deserialize(&value).map_err(|e| Error::Corruption {
                    address: root.0,
                    detail: e.to_string(),
                })?;
            max_id = max_id.max(info.structure_id.0);
        }
        Ok((MetaTree { tree }, max_id))
    }

    /// Look up the metadata record for `name`, if the store exists.
    pub fn get_meta_info(&self, name: &StoreName) -> Option<TreeMetaInfo> {
        self.tree
            .get(name.as_str().as_bytes())
            .and_then(|bytes| bincode::deserialize(&bytes).ok())
    }

    /// All store names currently recorded.
    pub fn store_names(&self) -> Vec<StoreName> {
        self.tree
            .iter()
            .map(|(key, _)| StoreName(String::from_utf8_lossy(&key).into_owned()))
            .collect()
    }

    /// Begin accumulating changes against this snapshot.
    pub fn mutable(&self) -> MetaTreeMutable {
        MetaTreeMutable {
            inner: self.tree.mutable(),
        }
    }
}

/// Mutable overlay for the MetaTree, accumulated during a write
/// transaction's commit and published atomically under the meta-lock.
pub struct MetaTreeMutable {
    inner: Box<dyn TreeMutable>,
}

impl MetaTreeMutable {
    /// Record (or overwrite) `name`'s metadata.
    pub fn put(&mut self, name: &StoreName, info: TreeMetaInfo) {
        let bytes = bincode::serialize(&info).expect("TreeMetaInfo serialization is infallible");
        self.inner.put(name.as_str().as_bytes().to_vec(), bytes);
    }

    /// Remove `name`'s metadata, returning whether it was present.
    pub fn remove(&mut self, name: &StoreName) -> bool {
        self.inner.delete(name.as_str().as_bytes())
    }

    /// Whether any change has been accumulated.
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    /// Serialize to a new log record, returning the new MetaTree plus the
    /// addresses it made unreachable.
    pub fn save(self, log: &dyn Log) -> Result<(MetaTree, Vec<LogAddress>)> {
        let (root, expired) = self.inner.save(log)?;
        let tree = LogBackedTree::load(log, root)?;
        Ok((MetaTree { tree }, expired))
    }
}

/// Decode all entries as a plain map, for diagnostics and tests.
pub fn decode_all(tree: &MetaTree) -> HashMap<StoreName, TreeMetaInfo> {
    tree.store_names()
        .into_iter()
        .filter_map(|name| {
            let info = tree.get_meta_info(&name)?;
            Some((name, info))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::InMemoryLog;

    #[test]
    fn fresh_meta_tree_is_empty() {
        let log = InMemoryLog::new("/tmp/x");
        let (meta, max_id) = MetaTree::load(&log, LogAddress::NONE).unwrap();
        assert_eq!(max_id, 1);
        assert!(meta.store_names().is_empty());
    }

    #[test]
    fn first_commit_survives_its_own_reload() {
        // The very first record a fresh log ever writes must not land at
        // address 0: `MetaTreeMutable::save` reloads the root it just
        // wrote, and address 0 is indistinguishable from "no root yet".
        let log = InMemoryLog::new("/tmp/x");
        let (meta, _) = MetaTree::load(&log, LogAddress::NONE).unwrap();
        let mut mutable = meta.mutable();
        let info = TreeMetaInfo {
            structure_id: StructureId(257),
            duplicates: false,
            key_prefixing: false,
            root: LogAddress::NONE,
        };
        mutable.put(&StoreName::from("a"), info);
        let (meta2, _) = mutable.save(&log).unwrap();

        assert_ne!(meta2.root_address(), LogAddress::NONE);
        assert_eq!(meta2.get_meta_info(&StoreName::from("a")), Some(info));
    }

    #[test]
    fn put_and_reload_round_trips() {
        let log = InMemoryLog::new("/tmp/x");
        let (meta, _) = MetaTree::load(&log, LogAddress::NONE).unwrap();
        let mut mutable = meta.mutable();
        let info = TreeMetaInfo {
            structure_id: StructureId(257),
            duplicates: false,
            key_prefixing: false,
            root: LogAddress::NONE,
        };
        mutable.put(&StoreName::from("a"), info);
        let (meta2, expired) = mutable.save(&log).unwrap();
        assert!(expired.is_empty());
        assert_eq!(meta2.get_meta_info(&StoreName::from("a")), Some(info));

        let (reloaded, max_id) = MetaTree::load(&log, meta2.root_address()).unwrap();
        assert_eq!(max_id, 257);
        assert_eq!(reloaded.get_meta_info(&StoreName::from("a")), Some(info));
    }
}
