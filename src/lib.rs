//! Strand: a transactional embedded storage environment.
//!
//! The environment coordinates multi-version concurrent access to a
//! collection of named key-value stores backed by a single append-only
//! log. This crate re-exports the pieces a caller actually needs; the
//! layering itself lives across `strand-core`, `strand-storage`,
//! `strand-concurrency`, and `strand-engine`.
//!
//! ```no_run
//! use strand::{Environment, EnvironmentConfig, StoreConfig, StoreName};
//! use std::sync::Arc;
//!
//! # fn main() -> strand::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let log = Arc::new(strand::FileLog::open(dir.path())?);
//! let env = Environment::open(log, EnvironmentConfig::default())?;
//!
//! env.execute_in_transaction(|txn| {
//!     let store = env
//!         .open_store(&StoreName::from("widgets"), StoreConfig::WITHOUT_DUPLICATES, txn, true)?
//!         .expect("creation_required=true always yields a store");
//!     env.put(txn, &store, b"k".to_vec(), b"v".to_vec())
//! })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub use strand_core::config::{ChangedSetting, ConfigSource, EnvironmentConfig, FileProperties};
pub use strand_core::error::{Error, ErrorKind, Result};
pub use strand_core::traits::{GarbageCollector, Log, Tree, TreeMutable};
pub use strand_core::types::{LogAddress, StoreConfig, StoreName, StructureId, TreeMetaInfo};

pub use strand_storage::{FileLog, InMemoryLog, LogBackedTree, MetaTree, LOG_FILE_EXTENSION};

pub use strand_concurrency::{CommitHook, DeferredTaskQueue, Task, Transaction, TransactionSet};

pub use strand_engine::{EnvMetrics, Environment, SimpleGc, Store, StoreGetCache, TreeNodesCache};
