//! Durable pointer to the MetaTree's current root address.
//!
//! The log itself is pure append — it has no notion of "the current root".
//! Something outside the log has to remember which record is the latest
//! MetaTree snapshot across a process restart. This sidecar file is that
//! something: a single `u64` written via a temp-file-then-rename so a
//! crash mid-write never leaves a torn pointer behind.

use std::fs;
use std::path::{Path, PathBuf};
use strand_core::error::Result;
use strand_core::types::LogAddress;

const FILE_NAME: &str = "meta.root";

/// Reads and writes the MetaTree root pointer sidecar at an environment's
/// log location.
pub struct RootPointer {
    path: PathBuf,
}

impl RootPointer {
    /// Point at the sidecar under `location` (created lazily on first write).
    pub fn new(location: impl AsRef<Path>) -> Self {
        Self {
            path: location.as_ref().join(FILE_NAME),
        }
    }

    /// Current root, or `LogAddress::NONE` if no pointer has been written yet.
    pub fn read(&self) -> Result<LogAddress> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                Ok(LogAddress(u64::from_le_bytes(buf)))
            }
            Ok(_) => Ok(LogAddress::NONE),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LogAddress::NONE),
            Err(e) => Err(e.into()),
        }
    }

    /// Durably record `root` as current.
    pub fn write(&self, root: LogAddress) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("root.tmp");
        fs::write(&tmp, root.0.to_le_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pointer_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let pointer = RootPointer::new(dir.path());
        assert_eq!(pointer.read().unwrap(), LogAddress::NONE);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let pointer = RootPointer::new(dir.path());
        pointer.write(LogAddress(4096)).unwrap();
        assert_eq!(pointer.read().unwrap(), LogAddress(4096));
        pointer.write(LogAddress(8192)).unwrap();
        assert_eq!(pointer.read().unwrap(), LogAddress(8192));
    }
}
