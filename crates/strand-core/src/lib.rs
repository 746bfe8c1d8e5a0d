//! Core types and contracts for the Strand environment coordinator.
//!
//! This crate defines the vocabulary every other layer shares: error
//! types, store/structure identifiers, the external-collaborator
//! contracts (`Log`, `Tree`/`TreeMutable`, `GarbageCollector`), and the
//! configuration surface. It holds no coordination logic itself.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{ChangedSetting, ConfigSource, EnvironmentConfig, FileProperties};
pub use error::{Error, ErrorKind, Result};
pub use traits::{GarbageCollector, Log, Tree, TreeMutable};
pub use types::{LogAddress, StoreConfig, StoreName, StructureId, TreeMetaInfo};
