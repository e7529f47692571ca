#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use quorumlite::{CommitCoordinator, Database, DatabaseConfig, JournalShard};

/// Configuration for one writer among `shards` concurrent writers.
pub fn sharded_config(path: &Path, shard: u16, shards: u16) -> DatabaseConfig {
    DatabaseConfig {
        shard: JournalShard::Numbered(shard),
        max_required_shard: Some(shards.saturating_sub(1)),
        ..DatabaseConfig::new(path)
    }
}

/// Open a handle on the unnumbered shard.
pub fn open_base(path: &Path, coordinator: &Arc<CommitCoordinator>) -> Database {
    Database::open(&DatabaseConfig::new(path), Arc::clone(coordinator)).unwrap()
}

/// Open a handle that surfaces engine contention immediately instead of
/// blocking on the busy timeout.
pub fn open_impatient(path: &Path, coordinator: &Arc<CommitCoordinator>) -> Database {
    let config = DatabaseConfig {
        busy_timeout: Duration::ZERO,
        ..DatabaseConfig::new(path)
    };
    Database::open(&config, Arc::clone(coordinator)).unwrap()
}

/// A fresh database file containing the test table `t (v INTEGER)`.
pub fn fresh_db(dir: &tempfile::TempDir, coordinator: &Arc<CommitCoordinator>) -> PathBuf {
    let path = dir.path().join("cluster.db");
    let mut db = open_base(&path, coordinator);
    db.verify_table("t", "CREATE TABLE t (v INTEGER)").unwrap();
    path
}

/// SHA-1 hex computed independently of the crate under test.
pub fn sha1_hex(data: &str) -> String {
    use sha1::{Digest, Sha1};
    use std::fmt::Write;

    let digest = Sha1::digest(data.as_bytes());
    let mut hex = String::with_capacity(40);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Run one full transaction with bounded retries on transient contention.
/// Panics if the transaction cannot be applied at all.
pub fn commit_with_retry(db: &mut Database, statement: &str) {
    for _ in 0..100 {
        db.begin_concurrent().unwrap();
        match db.write(statement) {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                db.rollback();
                std::thread::sleep(Duration::from_millis(2));
                continue;
            }
            Err(err) => panic!("write failed hard: {err}"),
        }
        db.prepare().unwrap();
        loop {
            match db.commit() {
                Ok(()) => return,
                Err(err) if err.is_transient() => {
                    std::thread::sleep(Duration::from_millis(2));
                }
                Err(err) => panic!("commit failed hard: {err}"),
            }
        }
    }
    panic!("transaction starved: {statement}");
}
