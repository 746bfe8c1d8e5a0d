//! Literal scenarios S1-S6 from the testable-properties section: basic
//! commit, conflict-and-retry, truncate id change, deferred-task
//! ordering, inoperative-after-failed-rollback, and config mismatch.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use strand_core::error::{Error, Result};
use strand_core::traits::Log;
use strand_core::types::{LogAddress, StoreConfig, StoreName};
use strand_core::EnvironmentConfig;
use strand_engine::Environment;
use strand_storage::InMemoryLog;

fn open_env() -> Environment {
    let log = Arc::new(InMemoryLog::new("/tmp/strand-scenarios"));
    Environment::open(log, EnvironmentConfig::default()).unwrap()
}

#[test]
fn s1_basic_commit() {
    let env = open_env();
    let name = StoreName::from("a");

    let mut w = env.begin_transaction(true, None).unwrap();
    let store = env
        .open_store(&name, StoreConfig::WITHOUT_DUPLICATES, &mut w, true)
        .unwrap()
        .unwrap();
    env.put(&mut w, &store, vec![0x01], b"A".to_vec()).unwrap();
    assert!(env.commit(&mut w).unwrap());

    let mut r = env.begin_readonly_transaction(None).unwrap();
    assert_eq!(env.get(&r, &store, &[0x01]).unwrap(), Some(b"A".to_vec()));
    env.abort(&mut r);

    env.close(false).unwrap();
}

#[test]
fn s2_conflict_and_retry() {
    let env = open_env();
    let name = StoreName::from("a");
    let cfg = StoreConfig::WITHOUT_DUPLICATES;

    // Store "a" pre-exists before either writer begins.
    env.execute_in_transaction(|txn| {
        env.open_store(&name, cfg, txn, true).map(|_| ())
    })
    .unwrap();

    let mut w1 = env.begin_transaction(true, None).unwrap();
    let mut w2 = env.begin_transaction(true, None).unwrap();
    let store1 = env.open_store(&name, cfg, &mut w1, false).unwrap().unwrap();
    let store2 = env.open_store(&name, cfg, &mut w2, false).unwrap().unwrap();

    env.put(&mut w1, &store1, vec![0x01], b"X".to_vec()).unwrap();
    assert!(env.commit(&mut w1).unwrap());

    env.put(&mut w2, &store2, vec![0x01], b"Y".to_vec()).unwrap();
    assert!(!env.flush(&mut w2).unwrap());

    env.revert(&mut w2).unwrap();
    assert_eq!(env.get(&w2, &store2, &[0x01]).unwrap(), Some(b"X".to_vec()));

    env.put(&mut w2, &store2, vec![0x01], b"Y".to_vec()).unwrap();
    assert!(env.commit(&mut w2).unwrap());

    let mut r = env.begin_readonly_transaction(None).unwrap();
    assert_eq!(env.get(&r, &store2, &[0x01]).unwrap(), Some(b"Y".to_vec()));
    env.abort(&mut r);
}

#[test]
fn s3_truncate_changes_structure_id() {
    let env = open_env();
    let name = StoreName::from("s");
    let cfg = StoreConfig::WITHOUT_DUPLICATES;

    let mut w = env.begin_transaction(true, None).unwrap();
    let store = env.open_store(&name, cfg, &mut w, true).unwrap().unwrap();
    let original_id = store.structure_id;
    env.put(&mut w, &store, vec![0x09], b"v".to_vec()).unwrap();
    assert!(env.commit(&mut w).unwrap());

    let mut w2 = env.begin_transaction(true, None).unwrap();
    env.truncate_store(&name, &mut w2).unwrap();
    assert!(env.commit(&mut w2).unwrap());

    let mut r = env.begin_readonly_transaction(None).unwrap();
    let store2 = env.open_store(&name, cfg, &mut r, false).unwrap().unwrap();
    assert_ne!(store2.structure_id, original_id);
    assert!(store2.structure_id.is_valid());
    assert_eq!(env.get(&r, &store2, &[0x09]).unwrap(), None);
    env.abort(&mut r);
}

#[test]
fn s4_deferred_task_runs_after_every_transaction_alive_at_enqueue() {
    let env = open_env();
    let name = StoreName::from("a");
    let cfg = StoreConfig::WITHOUT_DUPLICATES;

    let mut reader = env.begin_readonly_transaction(None).unwrap();
    let mut w = env.begin_transaction(true, None).unwrap();
    let store = env.open_store(&name, cfg, &mut w, true).unwrap().unwrap();
    env.put(&mut w, &store, vec![0x01], b"v".to_vec()).unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let ran2 = Arc::clone(&ran);
    env.execute_transaction_safe_task(Box::new(move || {
        ran2.store(true, Ordering::SeqCst);
    }));
    assert!(!ran.load(Ordering::SeqCst));

    assert!(env.commit(&mut w).unwrap());
    assert!(
        !ran.load(Ordering::SeqCst),
        "reader begun before the task was enqueued is still live"
    );

    env.abort(&mut reader);
    assert!(
        ran.load(Ordering::SeqCst),
        "task must run once every transaction alive at enqueue time has finished"
    );
}

struct FaultyLog {
    inner: InMemoryLog,
    fail_next_append: AtomicBool,
    fail_set_high_address: AtomicBool,
}

impl FaultyLog {
    fn new() -> Self {
        Self {
            inner: InMemoryLog::new("/tmp/strand-faulty"),
            fail_next_append: AtomicBool::new(false),
            fail_set_high_address: AtomicBool::new(false),
        }
    }
}

impl Log for FaultyLog {
    fn append(&self, payload: &[u8]) -> Result<LogAddress> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(Error::Corruption {
                address: self.inner.high_address(),
                detail: "injected append failure".to_string(),
            });
        }
        self.inner.append(payload)
    }

    fn read(&self, address: LogAddress) -> Result<Vec<u8>> {
        self.inner.read(address)
    }

    fn high_address(&self) -> u64 {
        self.inner.high_address()
    }

    fn set_high_address(&self, address: u64) -> Result<()> {
        if self.fail_set_high_address.load(Ordering::SeqCst) {
            return Err(Error::Corruption {
                address,
                detail: "injected rollback failure".to_string(),
            });
        }
        self.inner.set_high_address(address)
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }

    fn location(&self) -> &Path {
        self.inner.location()
    }

    fn created(&self) -> SystemTime {
        self.inner.created()
    }

    fn cache_hit_rate(&self) -> f64 {
        self.inner.cache_hit_rate()
    }

    fn set_sync_period(&self, millis: u64) {
        self.inner.set_sync_period(millis)
    }

    fn set_durable_write(&self, durable: bool) {
        self.inner.set_durable_write(durable)
    }
}

#[test]
fn s5_inoperative_after_failed_rollback() {
    let log = Arc::new(FaultyLog::new());
    let env = Environment::open(log.clone(), EnvironmentConfig::default()).unwrap();
    let name = StoreName::from("a");
    let cfg = StoreConfig::WITHOUT_DUPLICATES;

    let mut w = env.begin_transaction(true, None).unwrap();
    let store = env.open_store(&name, cfg, &mut w, true).unwrap().unwrap();
    env.put(&mut w, &store, vec![0x01], b"v".to_vec()).unwrap();

    log.fail_next_append.store(true, Ordering::SeqCst);
    log.fail_set_high_address.store(true, Ordering::SeqCst);

    let err = env.flush(&mut w).unwrap_err();
    match &err {
        Error::Inoperative(detail) => {
            assert!(
                detail.contains("injected append failure"),
                "wrapped cause must be the original commit failure, not the rollback failure: {detail}"
            );
        }
        other => panic!("expected Inoperative, got {other:?}"),
    }

    let begin_err = env.begin_transaction(true, None).unwrap_err();
    assert!(matches!(begin_err, Error::Inoperative(_)));
}

#[test]
fn s6_config_mismatch_does_not_touch_the_log() {
    let log = Arc::new(InMemoryLog::new("/tmp/strand-scenarios-s6"));
    let env = Environment::open(log.clone(), EnvironmentConfig::default()).unwrap();
    let name = StoreName::from("a");

    let mut w = env
        .begin_transaction(true, None)
        .unwrap();
    env.open_store(&name, StoreConfig::WITHOUT_DUPLICATES, &mut w, true)
        .unwrap();
    assert!(env.commit(&mut w).unwrap());

    let high_before = log.high_address();
    let mut w2 = env.begin_transaction(true, None).unwrap();
    let result = env.open_store(&name, StoreConfig::WITH_DUPLICATES, &mut w2, true);
    assert!(matches!(result, Err(Error::ConfigMismatch { .. })));
    assert_eq!(log.high_address(), high_before);
    env.abort(&mut w2);
}
