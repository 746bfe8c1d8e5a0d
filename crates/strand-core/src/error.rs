//! Error types for the Strand environment coordinator.
//!
//! One unified error enum for the whole workspace, per spec Section 7.
//! `Conflict` is deliberately not a variant constructed as an `Err` — the
//! commit path returns `Ok(false)` for a conflict, matching the contract
//! that callers retry via `revert` rather than unwind.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse category of an [`Error`], used by callers that branch on kind
/// rather than match the full variant (e.g. retry loops, metrics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requested entity does not exist.
    NotFound,
    /// Store configuration does not match what is already recorded.
    ConfigMismatch,
    /// Write attempted against a readonly environment.
    ReadonlyViolation,
    /// Environment is permanently inoperative after an unrecoverable commit failure.
    Inoperative,
    /// Environment has been closed.
    Closed,
    /// Operation requires no live transactions but some are still active.
    StillActive,
    /// Underlying I/O or log failure.
    Io,
}

/// Unified error type for Strand operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening a nonexistent store without `creation_required`, or
    /// removing/truncating an unknown store.
    #[error("store not found: {0}")]
    NotFound(String),

    /// Opening an existing store with incompatible `duplicates` or
    /// `prefixing` configuration.
    #[error("store config mismatch for {name}: {detail}")]
    ConfigMismatch {
        /// Name of the store whose configuration was rejected.
        name: String,
        /// Human-readable description of the mismatch.
        detail: String,
    },

    /// Any write attempted against a readonly environment.
    #[error("environment is readonly")]
    ReadonlyViolation,

    /// Set once an unrecoverable commit failure occurs; every subsequent
    /// begin/commit fails with this kind. Carries the original failure.
    #[error("environment is inoperative: {0}")]
    Inoperative(String),

    /// The environment has been closed; all further operations fail.
    #[error("environment is closed")]
    Closed,

    /// `clear` or a non-forced `close` was attempted with live transactions.
    #[error("{0} live transaction(s) still active")]
    StillActive(usize),

    /// Wraps an underlying I/O or log failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A side-car configuration file could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        /// Path of the offending config file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Data read back from the log failed to deserialize.
    #[error("corrupt log record at address {address}: {detail}")]
    Corruption {
        /// Log address of the offending record.
        address: u64,
        /// Human-readable description of the corruption.
        detail: String,
    },
}

impl Error {
    /// Coarse category for this error, mirroring spec Section 7.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::ConfigMismatch { .. } => ErrorKind::ConfigMismatch,
            Error::ReadonlyViolation => ErrorKind::ReadonlyViolation,
            Error::Inoperative(_) => ErrorKind::Inoperative,
            Error::Closed => ErrorKind::Closed,
            Error::StillActive(_) => ErrorKind::StillActive,
            Error::Io(_) | Error::ConfigParse { .. } | Error::Corruption { .. } => ErrorKind::Io,
        }
    }

    /// Whether a caller can reasonably retry the operation that produced
    /// this error. Conflicts are excluded on purpose: they are never
    /// represented as an `Error`, only as `Ok(false)` from `flush`.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
