//! Open-time configuration for a database handle.

use std::path::PathBuf;
use std::time::Duration;

use quorumlite_types::JournalShard;

/// Configuration for [`crate::Database::open`].
///
/// Every handle to the same file should agree on `max_required_shard` so
/// all of them see the same set of journal shards; `shard` is the one
/// table this particular handle appends to and must be unique per
/// concurrent writer thread.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path of the shared database file.
    pub path: PathBuf,

    /// Page cache size in KiB (`PRAGMA cache_size`, negative form).
    /// `0` keeps the engine default.
    pub cache_size_kib: u32,

    /// WAL autocheckpoint interval in pages (`PRAGMA wal_autocheckpoint`).
    pub wal_autocheckpoint: u32,

    /// How long the engine blocks on another writer before reporting busy
    /// (`PRAGMA busy_timeout`). Zero surfaces contention immediately.
    pub busy_timeout: Duration,

    /// Rows retained in this handle's own journal shard before old,
    /// fully-drained entries are pruned. `0` disables pruning.
    pub max_journal_size: u64,

    /// The journal shard this handle appends to.
    pub shard: JournalShard,

    /// Highest numbered shard that must exist. `None` means only the
    /// unnumbered `journal` table (plus `shard`, if numbered) is managed.
    pub max_required_shard: Option<u16>,
}

impl DatabaseConfig {
    /// Configuration with defaults suitable for a single-writer process:
    /// the unnumbered journal shard, a 10s busy timeout, and a million-row
    /// journal retention window.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache_size_kib: 0,
            wal_autocheckpoint: 1000,
            busy_timeout: Duration::from_secs(10),
            max_journal_size: 1_000_000,
            shard: JournalShard::Base,
            max_required_shard: None,
        }
    }
}
