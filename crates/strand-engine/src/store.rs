//! `Store`: a handle to one named key-value store, as returned by
//! [`crate::Environment::open_store`].
//!
//! A `Store` is cheap, `Clone`, and carries no lock — it is just the
//! metadata needed to address reads and writes against a transaction.

use strand_core::types::{StoreName, StructureId, TreeMetaInfo};

/// Handle to a named store, scoped to the transaction it was opened
/// against. Reads and writes go through `Environment::get`/`put`/`delete`,
/// not methods on `Store` itself — the same "driver function, not a
/// method on the data" shape as `Transaction` (spec Section 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// Name this store was opened under.
    pub name: StoreName,
    /// Structure id addressing this store's tree.
    pub structure_id: StructureId,
    /// Whether this store permits duplicate values per key.
    pub duplicates: bool,
    /// Whether this store physically realizes key prefixing.
    pub key_prefixing: bool,
    /// Whether this is a temporary, never-persisted store handed out for
    /// a readonly environment's `readonlyEmptyStores` policy.
    pub ephemeral: bool,
}

impl Store {
    /// Build a handle from a persisted or pending `TreeMetaInfo`.
    pub fn from_info(name: StoreName, info: TreeMetaInfo) -> Self {
        Self {
            name,
            structure_id: info.structure_id,
            duplicates: info.duplicates,
            key_prefixing: info.key_prefixing,
            ephemeral: false,
        }
    }

    /// Build a temporary, never-persisted empty-store handle.
    pub fn ephemeral(name: StoreName, duplicates: bool, key_prefixing: bool) -> Self {
        Self {
            name,
            structure_id: StructureId(0),
            duplicates,
            key_prefixing,
            ephemeral: true,
        }
    }
}
