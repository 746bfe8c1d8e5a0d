//! Core data types shared by every layer: store names, structure ids, log
//! addresses, and the per-store metadata record held in the MetaTree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset into the append-only log. The log's `high_address` is the next
/// free offset; a [`LogAddress`] of `0` is never a valid record start,
/// since every log begins with a header, so `0` doubles as "no root yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogAddress(pub u64);

impl LogAddress {
    /// Sentinel meaning "no record has been written yet".
    pub const NONE: LogAddress = LogAddress(0);

    /// Whether this address points at an actual record.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for LogAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Process-stable identifier for a store's tree, encoded into keys that
/// share a keyspace with other structures. Id `1` is reserved for the
/// MetaTree itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u32);

impl StructureId {
    /// The distinguished id of the MetaTree.
    pub const META_TREE: StructureId = StructureId(1);

    /// Low byte must never be zero: this guarantees id-encoded keys never
    /// share a terminal zero byte with string store-name keys in the
    /// MetaTree (spec Section 4.1, "Structure-id allocation").
    pub fn is_valid(self) -> bool {
        (self.0 & 0xff) != 0
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a named key-value store, as recorded in the MetaTree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreName(pub String);

impl StoreName {
    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StoreName {
    fn from(s: &str) -> Self {
        StoreName(s.to_string())
    }
}

impl From<String> for StoreName {
    fn from(s: String) -> Self {
        StoreName(s)
    }
}

/// Per-store metadata recorded in the MetaTree: structure id, the flags a
/// store was opened with, and the current root address of that store's
/// own tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetaInfo {
    /// Structure id used to address this store's tree.
    pub structure_id: StructureId,
    /// Whether this store permits duplicate values per key.
    pub duplicates: bool,
    /// Whether this store physically realizes key prefixing.
    pub key_prefixing: bool,
    /// Root address of this store's own tree as of the last commit that
    /// touched it.
    pub root: LogAddress,
}

/// Store-open configuration requested by a caller of `open_store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Whether duplicate values per key are requested.
    pub duplicates: bool,
    /// Whether key prefixing is requested.
    pub prefixing: bool,
}

impl StoreConfig {
    /// The common case: no duplicates, no prefixing.
    pub const WITHOUT_DUPLICATES: StoreConfig = StoreConfig {
        duplicates: false,
        prefixing: false,
    };

    /// Duplicates allowed, no prefixing.
    pub const WITH_DUPLICATES: StoreConfig = StoreConfig {
        duplicates: true,
        prefixing: false,
    };
}
