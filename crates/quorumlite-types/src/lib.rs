//! Shared types for the QuorumLite write-coordinator.
//!
//! Everything here is plain data: commit identifiers, journal shard names,
//! journal rows, the read whitelist, and per-transaction timing. The crates
//! above this one (`quorumlite-error`, `quorumlite-core`) give these types
//! their behavior.

pub mod result;
pub mod whitelist;

pub use result::QueryResult;
pub use whitelist::ReadWhitelist;

use std::fmt;
use std::time::Duration;

/// Identifier of a committed (or in-flight) transaction.
///
/// Commit ids are dense and strictly monotonically increasing across the
/// whole process: the coordinator hands out `current + 1` under the commit
/// lock, and a successful commit publishes exactly that value. Id 0 means
/// "no commits yet" and never appears in a journal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CommitId(u64);

impl CommitId {
    /// The state of a freshly created database: no commits.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw commit number.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw commit number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id a `prepare` would claim if this is the current counter value.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommitId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Which physical journal table a database handle appends to.
///
/// The unnumbered `journal` table always exists; numbered shards are named
/// `journalNNNN` with the shard id zero-padded to at least four digits
/// (`journal0000`, `journal0001`, ..., `journal10000`). Each handle writes
/// to exactly one shard so concurrent appenders never contend on rows;
/// readers union every shard back into one logical sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JournalShard {
    /// The plain `journal` table.
    #[default]
    Base,
    /// A numbered `journalNNNN` table.
    Numbered(u16),
}

impl JournalShard {
    /// The SQL table name for this shard.
    #[must_use]
    pub fn table_name(self) -> String {
        match self {
            Self::Base => "journal".to_owned(),
            Self::Numbered(n) => format!("journal{n:04}"),
        }
    }
}

impl fmt::Display for JournalShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table_name())
    }
}

/// The replicable payload of one commit: the concatenated write query and
/// the running hash of the database state after applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Verbatim concatenation of the transaction's write statements.
    pub query: String,
    /// 40-char lowercase hex SHA-1 of `previous hash ++ query`.
    pub hash: String,
}

/// A journal row as returned by range lookups: a [`JournalEntry`] together
/// with its commit id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: CommitId,
    pub query: String,
    pub hash: String,
}

/// Wall-clock time spent in each phase of the most recent transaction.
///
/// Reset when a transaction begins; `read` accumulates across a handle's
/// reads whether or not a transaction is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionTiming {
    pub begin: Duration,
    pub read: Duration,
    pub write: Duration,
    pub prepare: Duration,
    pub commit: Duration,
    pub rollback: Duration,
}

impl TransactionTiming {
    /// Total time across all phases.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.begin + self.read + self.write + self.prepare + self.commit + self.rollback
    }
}
