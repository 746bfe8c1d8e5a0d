//! `Log` implementations: an in-memory backend for tests and a
//! file-backed backend for real use. Both speak the same
//! `[len:u32][crc32:u32][payload]` framing (see [`crate::framing`]).

use crate::framing;
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use strand_core::error::{Error, Result};
use strand_core::traits::Log;
use strand_core::types::LogAddress;

/// In-memory `Log`, used by tests and ephemeral environments.
pub struct InMemoryLog {
    buffer: RwLock<Vec<u8>>,
    high_address: AtomicU64,
    location: PathBuf,
    created: SystemTime,
    sync_period_ms: AtomicU64,
    durable_write: parking_lot::Mutex<bool>,
}

impl InMemoryLog {
    /// Create an empty in-memory log, reporting `location` for diagnostics.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        let header = framing::reserved_header_record();
        let high_address = header.len() as u64;
        Self {
            buffer: RwLock::new(header),
            high_address: AtomicU64::new(high_address),
            location: location.into(),
            created: SystemTime::now(),
            sync_period_ms: AtomicU64::new(1_000),
            durable_write: parking_lot::Mutex::new(false),
        }
    }
}

impl Log for InMemoryLog {
    fn append(&self, payload: &[u8]) -> Result<LogAddress> {
        let mut buffer = self.buffer.write();
        let address = buffer.len() as u64;
        buffer.extend_from_slice(&framing::encode(payload));
        self.high_address.store(buffer.len() as u64, Ordering::SeqCst);
        Ok(LogAddress(address))
    }

    fn read(&self, address: LogAddress) -> Result<Vec<u8>> {
        let buffer = self.buffer.read();
        let start = address.0 as usize;
        if start + framing::HEADER_LEN > buffer.len() {
            return Err(Error::Corruption {
                address: address.0,
                detail: "address past end of log".to_string(),
            });
        }
        framing::decode(&buffer[start..]).map_err(|e| Error::Corruption {
            address: address.0,
            detail: e.to_string(),
        })
    }

    fn high_address(&self) -> u64 {
        self.high_address.load(Ordering::SeqCst)
    }

    fn set_high_address(&self, address: u64) -> Result<()> {
        let mut buffer = self.buffer.write();
        buffer.truncate(address as usize);
        self.high_address.store(address, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let header = framing::reserved_header_record();
        self.high_address.store(header.len() as u64, Ordering::SeqCst);
        *self.buffer.write() = header;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn created(&self) -> SystemTime {
        self.created
    }

    fn cache_hit_rate(&self) -> f64 {
        0.0
    }

    fn set_sync_period(&self, millis: u64) {
        self.sync_period_ms.store(millis, Ordering::Relaxed);
    }

    fn set_durable_write(&self, durable: bool) {
        *self.durable_write.lock() = durable;
    }
}

/// File-backed `Log`, using extension `.strandlog` (the workspace's
/// equivalent of the teacher's `LOG_FILE_EXTENSION`).
pub struct FileLog {
    file: RwLock<File>,
    high_address: AtomicU64,
    location: PathBuf,
    created: SystemTime,
    sync_period_ms: AtomicU64,
    durable_write: parking_lot::Mutex<bool>,
}

/// Extension used for the single append-only log file at an environment's location.
pub const LOG_FILE_EXTENSION: &str = "strandlog";

impl FileLog {
    /// Open (creating if absent) the log file at `location`.
    pub fn open(location: impl AsRef<Path>) -> Result<Self> {
        let location = location.as_ref();
        std::fs::create_dir_all(location)?;
        let path = location.join(format!("data.{LOG_FILE_EXTENSION}"));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        if file.metadata()?.len() == 0 {
            file.write_all(&framing::reserved_header_record())?;
        }
        let high_address = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file: RwLock::new(file),
            high_address: AtomicU64::new(high_address),
            location: location.to_path_buf(),
            created: SystemTime::now(),
            sync_period_ms: AtomicU64::new(1_000),
            durable_write: parking_lot::Mutex::new(false),
        })
    }
}

impl Log for FileLog {
    fn append(&self, payload: &[u8]) -> Result<LogAddress> {
        let mut file = self.file.write();
        let address = file.seek(SeekFrom::End(0))?;
        framing::write_record(&mut *file, payload)?;
        if *self.durable_write.lock() {
            file.sync_data()?;
        }
        self.high_address
            .store(address + framing::record_len(payload.len()) as u64, Ordering::SeqCst);
        Ok(LogAddress(address))
    }

    fn read(&self, address: LogAddress) -> Result<Vec<u8>> {
        let mut file = self.file.write();
        file.seek(SeekFrom::Start(address.0))?;
        let mut header = [0u8; framing::HEADER_LEN];
        file.read_exact(&mut header)?;
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let mut record = Vec::with_capacity(framing::HEADER_LEN + len);
        record.extend_from_slice(&header);
        let mut payload = vec![0u8; len];
        file.read_exact(&mut payload)?;
        record.extend_from_slice(&payload);
        framing::decode(&record).map_err(|e| Error::Corruption {
            address: address.0,
            detail: e.to_string(),
        })
    }

    fn high_address(&self) -> u64 {
        self.high_address.load(Ordering::SeqCst)
    }

    fn set_high_address(&self, address: u64) -> Result<()> {
        let file = self.file.write();
        file.set_len(address)?;
        self.high_address.store(address, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut file = self.file.write();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        let header = framing::reserved_header_record();
        file.write_all(&header)?;
        self.high_address.store(header.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.file.write().sync_all()?;
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.location
    }

    fn created(&self) -> SystemTime {
        self.created
    }

    fn cache_hit_rate(&self) -> f64 {
        0.0
    }

    fn set_sync_period(&self, millis: u64) {
        self.sync_period_ms.store(millis, Ordering::Relaxed);
    }

    fn set_durable_write(&self, durable: bool) {
        *self.durable_write.lock() = durable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trip() {
        let log = InMemoryLog::new("/tmp/nonexistent");
        let addr = log.append(b"hello").unwrap();
        assert_eq!(log.read(addr).unwrap(), b"hello");
    }

    #[test]
    fn in_memory_rollback() {
        let log = InMemoryLog::new("/tmp/nonexistent");
        let high0 = log.high_address();
        log.append(b"one").unwrap();
        log.append(b"two").unwrap();
        log.set_high_address(high0).unwrap();
        assert_eq!(log.high_address(), high0);
    }

    #[test]
    fn file_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::open(dir.path()).unwrap();
        let a1 = log.append(b"alpha").unwrap();
        let a2 = log.append(b"beta").unwrap();
        assert_eq!(log.read(a1).unwrap(), b"alpha");
        assert_eq!(log.read(a2).unwrap(), b"beta");
    }

    #[test]
    fn file_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let addr;
        {
            let log = FileLog::open(dir.path()).unwrap();
            addr = log.append(b"persisted").unwrap();
            log.close().unwrap();
        }
        let log = FileLog::open(dir.path()).unwrap();
        assert_eq!(log.read(addr).unwrap(), b"persisted");
    }

    #[test]
    fn first_append_is_never_address_none() {
        let log = InMemoryLog::new("/tmp/nonexistent");
        let addr = log.append(b"first").unwrap();
        assert_ne!(addr, LogAddress::NONE);

        let dir = tempfile::tempdir().unwrap();
        let file_log = FileLog::open(dir.path()).unwrap();
        let addr = file_log.append(b"first").unwrap();
        assert_ne!(addr, LogAddress::NONE);
    }

    #[test]
    fn clear_reserves_address_zero_again() {
        let log = InMemoryLog::new("/tmp/nonexistent");
        log.append(b"one").unwrap();
        log.clear().unwrap();
        let addr = log.append(b"two").unwrap();
        assert_ne!(addr, LogAddress::NONE);
        assert_eq!(log.read(addr).unwrap(), b"two");
    }

    #[test]
    fn corrupt_record_detected() {
        let log = InMemoryLog::new("/tmp/nonexistent");
        let addr = log.append(b"clean").unwrap();
        {
            let mut buffer = log.buffer.write();
            let flip = addr.0 as usize + framing::HEADER_LEN;
            buffer[flip] ^= 0xff;
        }
        assert!(log.read(addr).is_err());
    }
}
