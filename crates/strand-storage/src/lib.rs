//! `Log` and `Tree` implementations backing the environment coordinator.
//!
//! This crate supplies the only concrete realizations of the external
//! contracts defined in `strand-core::traits`: an append-only log (in
//! memory, for tests, and file-backed, for real use) and a persistent
//! B-tree materialized from single-record log snapshots.

#![warn(missing_docs)]

pub mod framing;
pub mod log;
pub mod meta_tree;
pub mod tree;

pub use log::{FileLog, InMemoryLog, LOG_FILE_EXTENSION};
pub use meta_tree::{MetaTree, MetaTreeMutable};
pub use tree::{LogBackedTree, MutableTree};
