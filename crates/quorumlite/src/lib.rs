//! Public API facade for QuorumLite.
//!
//! QuorumLite turns a per-process SQLite file into a primitive for a
//! replicated cluster: every commit extends a SHA-1 running hash, every
//! write statement is journaled for replay by peers, and a process-wide
//! commit lock keeps commit ids dense and strictly monotonic while
//! transaction bodies run on parallel threads.
//!
//! Construct one [`CommitCoordinator`] at process init, then open one
//! [`Database`] per writer thread against the shared file:
//!
//! ```no_run
//! use std::sync::Arc;
//! use quorumlite::{CommitCoordinator, Database, DatabaseConfig};
//!
//! # fn main() -> quorumlite::Result<()> {
//! let coordinator = Arc::new(CommitCoordinator::new());
//! let mut db = Database::open(
//!     &DatabaseConfig::new("cluster.db"),
//!     Arc::clone(&coordinator),
//! )?;
//!
//! db.begin_concurrent()?;
//! db.write("INSERT INTO accounts VALUES (1, 100);")?;
//! db.prepare()?;
//! db.commit()?;
//!
//! // The replication layer ships this to peers, in commit order.
//! for (id, entry) in db.drain_committed_transactions() {
//!     println!("{id}: {} -> {}", entry.query, entry.hash);
//! }
//! # Ok(())
//! # }
//! ```

pub use quorumlite_core::{CommitCoordinator, CommitLockGuard, Database, DatabaseConfig};
pub use quorumlite_error::{ErrorCode, QuorumError, Result};
pub use quorumlite_types::{
    CommitId, CommitRecord, JournalEntry, JournalShard, QueryResult, ReadWhitelist,
    TransactionTiming,
};
