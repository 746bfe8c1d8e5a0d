//! Concurrency primitives for the environment coordinator: the live
//! transaction set, the transaction data structure itself, and the
//! transaction-safe deferred task queue.
//!
//! This crate holds no log or meta-tree mutation logic — it only tracks
//! state. The coordination logic (commit algorithm, lock ordering) lives
//! in `strand-engine`, which drives these types.

#![warn(missing_docs)]

pub mod deferred;
pub mod transaction;
pub mod transaction_set;

pub use deferred::{DeferredTaskQueue, Task};
pub use transaction::{CommitHook, PendingTree, Transaction};
pub use transaction_set::TransactionSet;
