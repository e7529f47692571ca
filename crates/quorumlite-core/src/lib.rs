//! Core of the QuorumLite replicated write-coordinator.
//!
//! A [`Database`] is a per-thread handle over one shared SQLite file. Reads
//! run freely; writes accumulate in the handle's open transaction. At
//! `prepare` the handle takes the process-wide recursive commit lock,
//! claims the next commit id, extends the SHA-1 running hash, and appends
//! the transaction's statements to its own journal shard; `commit` flushes
//! the engine and publishes the new id and hash. The replication layer
//! drains committed transactions from the [`CommitCoordinator`] in commit
//! order, exactly once.
//!
//! The commit lock is held only across the `prepare..commit` window, so
//! transaction bodies on different threads still run in parallel; the lock
//! is the single serialization point that keeps commit ids dense and the
//! hash chain linear.

mod authorizer;

pub mod config;
pub mod coordinator;
pub mod db;
pub mod hash;
pub mod journal;
pub mod schema;

pub use config::DatabaseConfig;
pub use coordinator::{CommitCoordinator, CommitLockGuard};
pub use db::Database;
