//! The environment coordinator: commit algorithm, transaction lifecycle,
//! store management, caches, and the default garbage collector.
//!
//! This crate is the only one that touches the log and the meta-lock at
//! the same time — `strand-core` defines the contracts, `strand-storage`
//! supplies concrete `Log`/`Tree` backends, `strand-concurrency` tracks
//! transaction state, and this crate drives all three.

#![warn(missing_docs)]

pub mod caches;
pub mod environment;
pub mod gc;
pub mod metrics;
pub mod root_pointer;
pub mod store;

pub use caches::{StoreGetCache, StoreGetKey, TreeNodesCache};
pub use environment::Environment;
pub use gc::SimpleGc;
pub use metrics::EnvMetrics;
pub use store::Store;
