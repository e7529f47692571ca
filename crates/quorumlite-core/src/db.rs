//! The per-thread database facade.
//!
//! One `Database` wraps one engine connection to the shared file. Opening
//! verifies every journal shard, recovers the commit head into the
//! coordinator, and probes whether the linked engine supports
//! `BEGIN CONCURRENT`. From there the handle walks the transaction state
//! machine: `begin*` → `write`* → `prepare` → `commit` (or `rollback` from
//! anywhere). `prepare` takes the process-wide commit lock and keeps it
//! until the transaction commits or rolls back; a busy verdict from the
//! engine at `commit` leaves the transaction prepared so the caller can
//! retry or roll back.

use std::collections::BTreeMap;
use std::sync::{Arc, Once};
use std::time::Instant;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use quorumlite_error::{QuorumError, Result};
use quorumlite_types::{
    CommitId, CommitRecord, JournalEntry, QueryResult, ReadWhitelist, TransactionTiming,
};

use crate::authorizer;
use crate::config::DatabaseConfig;
use crate::coordinator::{CommitCoordinator, CommitLockGuard};
use crate::hash;
use crate::journal::Journal;
use crate::schema;

/// Leading keywords accepted by the read surface.
const READ_KEYWORDS: &[&str] = &["SELECT", "VALUES", "WITH", "EXPLAIN"];

static ENGINE_LOG_BRIDGE: Once = Once::new();

/// Route the engine's internal log stream into `tracing`. Must run before
/// the library initializes, hence once, at the first open in the process;
/// if the engine is somehow already initialized the call is a no-op.
fn install_engine_log_bridge() {
    ENGINE_LOG_BRIDGE.call_once(|| {
        // SAFETY: guarded by `Once`, invoked before this process opens its
        // first connection.
        unsafe {
            let _ = rusqlite::trace::config_log(Some(|code, message| {
                debug!(code, "sqlite: {message}");
            }));
        }
    });
}

fn value_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

fn ensure_read_statement(query: &str) -> Result<()> {
    let keyword = query.split_whitespace().next().unwrap_or("");
    if READ_KEYWORDS
        .iter()
        .any(|allowed| keyword.eq_ignore_ascii_case(allowed))
    {
        Ok(())
    } else {
        Err(QuorumError::invalid_query(keyword.to_owned()))
    }
}

/// A per-thread handle onto the shared, replicated database.
///
/// Handles are cheap relative to the file: every writer thread owns one,
/// all of them sharing a single [`CommitCoordinator`]. The handle is not
/// `Sync`; while a transaction is prepared it also pins the commit lock to
/// its thread.
pub struct Database {
    conn: Connection,
    filename: String,
    coordinator: Arc<CommitCoordinator>,
    journal: Journal,
    whitelist: Option<Arc<ReadWhitelist>>,
    supports_concurrent: bool,
    inside_transaction: bool,
    uncommitted_query: String,
    uncommitted_hash: String,
    prepared_commit: Option<CommitId>,
    commit_guard: Option<CommitLockGuard>,
    last_write_changes: u64,
    last_error: Option<String>,
    timing: TransactionTiming,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("filename", &self.filename)
            .field("shard", &self.journal.own_table())
            .field("inside_transaction", &self.inside_transaction)
            .field("prepared_commit", &self.prepared_commit)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open a handle onto `config.path`.
    ///
    /// Applies the engine pragmas (WAL mode is required for multi-handle
    /// operation), verifies or creates every journal shard in scope, and
    /// folds the on-disk commit head into the coordinator. Fails on any
    /// shard whose schema does not match.
    pub fn open(config: &DatabaseConfig, coordinator: Arc<CommitCoordinator>) -> Result<Self> {
        install_engine_log_bridge();

        let conn = Connection::open(&config.path).map_err(QuorumError::from)?;
        apply_pragmas(&conn, config)?;
        let supports_concurrent = conn.prepare("BEGIN CONCURRENT").is_ok();

        let mut journal = Journal::new(
            config.shard,
            config.max_required_shard,
            config.max_journal_size,
        );
        {
            let _window = coordinator.lock_commits();
            journal.ensure_schema(&conn)?;
            journal.load_size(&conn)?;
            let head = journal.max_commit_id(&conn)?;
            let head_hash = journal.head_hash(&conn)?;
            coordinator.recover(head, &head_hash);
        }

        let filename = config.path.display().to_string();
        info!(
            path = %filename,
            shard = %journal.own_table(),
            supports_concurrent,
            commit_count = %coordinator.commit_count(),
            "opened database handle"
        );

        Ok(Self {
            conn,
            filename,
            coordinator,
            journal,
            whitelist: None,
            supports_concurrent,
            inside_transaction: false,
            uncommitted_query: String::new(),
            uncommitted_hash: String::new(),
            prepared_commit: None,
            commit_guard: None,
            last_write_changes: 0,
            last_error: None,
            timing: TransactionTiming::default(),
        })
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Run a read-only query, inside or outside a transaction.
    ///
    /// Reads never touch the journal or the uncommitted query. With a
    /// whitelist installed, the authorizer filters every referenced
    /// column.
    pub fn read(&mut self, query: &str) -> Result<QueryResult> {
        let started = Instant::now();
        let result = self.run_read(query);
        self.timing.read += started.elapsed();
        self.note(result)
    }

    /// Run a read-only query that produces a single cell: first column of
    /// the first row, or the empty string if the result set is empty.
    pub fn read_one(&mut self, query: &str) -> Result<String> {
        let result = self.read(query)?;
        Ok(result.cell(0, 0).unwrap_or_default().to_owned())
    }

    fn run_read(&self, query: &str) -> Result<QueryResult> {
        ensure_read_statement(query)?;
        let mut stmt = self.conn.prepare(query).map_err(QuorumError::from)?;
        let headers: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let columns = headers.len();

        let mut out = Vec::new();
        let mut rows = stmt.query([]).map_err(QuorumError::from)?;
        while let Some(row) = rows.next().map_err(QuorumError::from)? {
            let mut cells = Vec::with_capacity(columns);
            for index in 0..columns {
                cells.push(value_to_string(
                    row.get_ref(index).map_err(QuorumError::from)?,
                ));
            }
            out.push(cells);
        }
        Ok(QueryResult::new(headers, out))
    }

    // ── Transaction state machine ────────────────────────────────────────

    /// Begin an exclusive-style transaction.
    pub fn begin(&mut self) -> Result<()> {
        self.begin_with("BEGIN")
    }

    /// Begin a snapshot transaction that may run concurrently with other
    /// writers. On engines without the begin-concurrent patch this
    /// degrades to a plain `BEGIN`; the commit protocol is identical
    /// either way.
    pub fn begin_concurrent(&mut self) -> Result<()> {
        if self.supports_concurrent {
            self.begin_with("BEGIN CONCURRENT")
        } else {
            self.begin_with("BEGIN")
        }
    }

    fn begin_with(&mut self, sql: &str) -> Result<()> {
        if self.inside_transaction {
            return self.note(Err(QuorumError::AlreadyInTransaction));
        }
        let started = Instant::now();
        self.timing = TransactionTiming::default();
        let result = self.conn.execute_batch(sql).map_err(QuorumError::from);
        if result.is_ok() {
            self.inside_transaction = true;
            self.uncommitted_query.clear();
            self.uncommitted_hash.clear();
        }
        self.timing.begin = started.elapsed();
        self.note(result)
    }

    /// Execute a write statement inside the open transaction and record
    /// it for the journal.
    ///
    /// Fails with [`QuorumError::ReadOnly`] on whitelisted handles and
    /// with [`QuorumError::AlreadyPrepared`] once `prepare` has run; a
    /// prepared transaction accepts no further writes.
    pub fn write(&mut self, query: &str) -> Result<()> {
        let started = Instant::now();
        let result = self.run_write(query);
        self.timing.write += started.elapsed();
        self.note(result)
    }

    fn run_write(&mut self, query: &str) -> Result<()> {
        if self.whitelist.is_some() {
            return Err(QuorumError::ReadOnly);
        }
        if !self.inside_transaction {
            return Err(QuorumError::NotInTransaction);
        }
        if self.prepared_commit.is_some() {
            return Err(QuorumError::AlreadyPrepared);
        }
        self.conn.execute_batch(query).map_err(QuorumError::from)?;
        self.last_write_changes = self.conn.changes();
        self.uncommitted_query.push_str(query);
        if !query.ends_with(';') {
            self.uncommitted_query.push(';');
        }
        Ok(())
    }

    /// Claim the next commit id and stage this transaction for commit.
    ///
    /// Takes the process-wide commit lock (re-entry by the holding thread
    /// is legal), fixes the new running hash against the committed hash,
    /// appends the journal row to this handle's shard, and registers the
    /// in-flight entry. The lock stays held until `commit` succeeds or
    /// `rollback` runs, including when the journal append itself fails;
    /// in that case the caller must roll back.
    pub fn prepare(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.run_prepare();
        self.timing.prepare += started.elapsed();
        self.note(result)
    }

    fn run_prepare(&mut self) -> Result<()> {
        if !self.inside_transaction {
            return Err(QuorumError::NotInTransaction);
        }
        if self.prepared_commit.is_some() {
            return Err(QuorumError::AlreadyPrepared);
        }

        let window = self.coordinator.lock_commits();
        let next = self.coordinator.commit_count().next();
        let base = self.coordinator.committed_hash();
        self.uncommitted_hash = hash::chain_hash(&base, &self.uncommitted_query);
        self.commit_guard = Some(window);

        self.journal
            .append(&self.conn, next, &self.uncommitted_query, &self.uncommitted_hash)?;

        if self.journal.needs_truncation() {
            let size_floor = (next.get() + 1).saturating_sub(self.journal.max_size());
            let drain_floor = self
                .coordinator
                .oldest_in_flight()
                .map_or(u64::MAX, CommitId::get);
            let floor = size_floor.min(drain_floor);
            if floor > 1 {
                self.journal.truncate_below(&self.conn, CommitId::new(floor))?;
            }
        }

        self.coordinator.register_in_flight(
            next,
            JournalEntry {
                query: self.uncommitted_query.clone(),
                hash: self.uncommitted_hash.clone(),
            },
        );
        self.prepared_commit = Some(next);
        debug!(id = %next, shard = %self.journal.own_table(), "prepared transaction");
        Ok(())
    }

    /// Commit the prepared transaction.
    ///
    /// A busy/conflict verdict from the engine is returned verbatim as a
    /// transient error with the transaction left fully prepared: the
    /// in-flight entry stays registered, the commit lock stays held, and
    /// the caller decides between retrying `commit` and calling
    /// `rollback`. On success the commit id counter, the committed hash,
    /// and the drainable set advance atomically under the lock before it
    /// is released.
    pub fn commit(&mut self) -> Result<()> {
        let started = Instant::now();
        let result = self.run_commit();
        self.timing.commit += started.elapsed();
        self.note(result)
    }

    fn run_commit(&mut self) -> Result<()> {
        if !self.inside_transaction {
            return Err(QuorumError::NotInTransaction);
        }
        let Some(id) = self.prepared_commit else {
            return Err(QuorumError::NotPrepared);
        };

        match self.conn.execute_batch("COMMIT") {
            Ok(()) => {
                self.coordinator
                    .publish_commit(id, self.uncommitted_hash.clone());
                self.prepared_commit = None;
                self.commit_guard = None;
                self.inside_transaction = false;
                self.uncommitted_query.clear();
                self.uncommitted_hash.clear();
                debug!(id = %id, "committed transaction");
                Ok(())
            }
            Err(err) => {
                let err = QuorumError::from(err);
                if err.is_transient() {
                    warn!(id = %id, %err, "engine rejected commit; transaction still prepared");
                }
                Err(err)
            }
        }
    }

    /// Abandon the current transaction.
    ///
    /// Safe from any state and on any exit path: rolls the engine back if
    /// a transaction is open (tolerating an engine that already aborted
    /// it), withdraws the in-flight entry if one was prepared, releases
    /// the commit lock if held, and clears the uncommitted fields.
    pub fn rollback(&mut self) {
        let started = Instant::now();
        if self.inside_transaction {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                // After an I/O failure the engine may have rolled back on
                // its own, leaving no open transaction.
                debug!(%err, "engine rollback reported an error");
            }
        }
        if let Some(id) = self.prepared_commit.take() {
            self.coordinator.forget_in_flight(id);
            self.journal.note_rollback();
            debug!(id = %id, "rolled back prepared transaction");
        }
        self.commit_guard = None;
        self.inside_transaction = false;
        self.uncommitted_query.clear();
        self.uncommitted_hash.clear();
        self.timing.rollback += started.elapsed();
    }

    // ── Journal lookups & replication drain ──────────────────────────────

    /// The query and hash of one commit, across all journal shards.
    pub fn get_commit(&mut self, id: CommitId) -> Result<Option<JournalEntry>> {
        let result = self.journal.get_commit(&self.conn, id);
        self.note(result)
    }

    /// All commits in the inclusive id range, across all journal shards,
    /// ascending.
    pub fn get_commits(&mut self, from: CommitId, to: CommitId) -> Result<Vec<CommitRecord>> {
        let result = self.journal.get_commits(&self.conn, from, to);
        self.note(result)
    }

    /// Atomically remove and return every committed-but-undrained
    /// transaction for replication to peers. See
    /// [`CommitCoordinator::drain_committed`].
    #[must_use]
    pub fn drain_committed_transactions(&self) -> BTreeMap<CommitId, JournalEntry> {
        self.coordinator.drain_committed()
    }

    // ── Schema helpers ───────────────────────────────────────────────────

    /// Ensure `name` exists with exactly the schema `sql`; `Ok(true)`
    /// means the table was created.
    pub fn verify_table(&mut self, name: &str, sql: &str) -> Result<bool> {
        let result = schema::verify_table(&self.conn, name, sql);
        self.note(result)
    }

    /// Add a column to an existing table.
    pub fn add_column(&mut self, table: &str, column: &str, column_type: &str) -> Result<()> {
        let result = schema::add_column(&self.conn, table, column, column_type);
        self.note(result)
    }

    // ── Access control ───────────────────────────────────────────────────

    /// Install or clear the read whitelist.
    ///
    /// With a whitelist present the handle is in restrictive mode: only
    /// listed `(table, column)` reads are authorized and every write is
    /// denied, the handle's own journal bookkeeping included.
    pub fn set_whitelist(&mut self, whitelist: Option<ReadWhitelist>) {
        match whitelist {
            Some(whitelist) => {
                let whitelist = Arc::new(whitelist);
                authorizer::install(&self.conn, Arc::clone(&whitelist));
                self.whitelist = Some(whitelist);
            }
            None => {
                authorizer::clear(&self.conn);
                self.whitelist = None;
            }
        }
    }

    /// The currently installed whitelist, if any.
    #[must_use]
    pub fn whitelist(&self) -> Option<&ReadWhitelist> {
        self.whitelist.as_deref()
    }

    // ── Observability ────────────────────────────────────────────────────

    /// Path this handle was opened against.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Highest committed id across the whole process.
    #[must_use]
    pub fn commit_count(&self) -> CommitId {
        self.coordinator.commit_count()
    }

    /// Hash of the state after the highest commit by *any* thread.
    #[must_use]
    pub fn committed_hash(&self) -> String {
        self.coordinator.committed_hash()
    }

    /// The hash the database state will carry if the current transaction
    /// commits. Empty outside of a prepared transaction.
    #[must_use]
    pub fn uncommitted_hash(&self) -> &str {
        &self.uncommitted_hash
    }

    /// Concatenation of the write statements executed in the current
    /// uncommitted transaction.
    #[must_use]
    pub fn uncommitted_query(&self) -> &str {
        &self.uncommitted_query
    }

    /// Whether a transaction is open on this handle.
    #[must_use]
    pub fn inside_transaction(&self) -> bool {
        self.inside_transaction
    }

    /// Whether this handle currently holds the commit lock (i.e. has a
    /// prepared or prepare-failed transaction).
    #[must_use]
    pub fn holds_commit_lock(&self) -> bool {
        self.commit_guard.is_some()
    }

    /// Whether the linked engine accepted `BEGIN CONCURRENT` at open.
    #[must_use]
    pub fn supports_concurrent_transactions(&self) -> bool {
        self.supports_concurrent
    }

    /// Rowid of the most recent insert on this handle.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Total number of row changes over this handle's lifetime.
    pub fn change_count(&mut self) -> Result<u64> {
        let result = self
            .conn
            .query_row("SELECT total_changes()", [], |row| row.get::<_, i64>(0))
            .map(|n| u64::try_from(n).unwrap_or(0))
            .map_err(QuorumError::from);
        self.note(result)
    }

    /// Rows changed by the most recent `write`.
    #[must_use]
    pub fn last_write_change_count(&self) -> u64 {
        self.last_write_changes
    }

    /// Per-phase timing of the most recent transaction.
    #[must_use]
    pub fn last_transaction_timing(&self) -> TransactionTiming {
        self.timing
    }

    /// Message of the most recent failed operation on this handle, or the
    /// empty string.
    #[must_use]
    pub fn last_error(&self) -> &str {
        self.last_error.as_deref().unwrap_or_default()
    }

    fn note<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }
}

fn apply_pragmas(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout)
        .map_err(QuorumError::from)?;
    let mut pragmas = vec![
        "PRAGMA journal_mode=WAL;".to_owned(),
        "PRAGMA synchronous=NORMAL;".to_owned(),
        format!("PRAGMA wal_autocheckpoint={};", config.wal_autocheckpoint),
    ];
    if config.cache_size_kib > 0 {
        pragmas.push(format!("PRAGMA cache_size=-{};", config.cache_size_kib));
    }
    for pragma in &pragmas {
        conn.execute_batch(pragma).map_err(QuorumError::from)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_fixture() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("test.db"));
        let coordinator = Arc::new(CommitCoordinator::new());
        let mut db = Database::open(&config, coordinator).unwrap();
        db.verify_table("t", "CREATE TABLE t (v INTEGER)").unwrap();
        (dir, db)
    }

    #[test]
    fn open_creates_journal_shards() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            shard: quorumlite_types::JournalShard::Numbered(2),
            max_required_shard: Some(2),
            ..DatabaseConfig::new(dir.path().join("test.db"))
        };
        let mut db = Database::open(&config, Arc::new(CommitCoordinator::new())).unwrap();

        let names = db
            .read("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names: Vec<&str> = names.rows().iter().map(|row| row[0].as_str()).collect();
        assert_eq!(names, ["journal", "journal0000", "journal0001", "journal0002"]);
        assert_eq!(db.commit_count(), CommitId::ZERO);
        assert_eq!(db.committed_hash(), "");
    }

    #[test]
    fn state_machine_violations() {
        let (_dir, mut db) = open_fixture();

        assert!(matches!(
            db.write("INSERT INTO t VALUES(1)"),
            Err(QuorumError::NotInTransaction)
        ));
        assert!(matches!(db.prepare(), Err(QuorumError::NotInTransaction)));
        assert!(matches!(db.commit(), Err(QuorumError::NotInTransaction)));

        db.begin().unwrap();
        assert!(matches!(db.begin(), Err(QuorumError::AlreadyInTransaction)));
        assert!(matches!(db.commit(), Err(QuorumError::NotPrepared)));

        db.prepare().unwrap();
        assert!(matches!(
            db.write("INSERT INTO t VALUES(1)"),
            Err(QuorumError::AlreadyPrepared)
        ));
        assert!(matches!(db.prepare(), Err(QuorumError::AlreadyPrepared)));
        db.rollback();
        assert!(!db.inside_transaction());
    }

    #[test]
    fn read_rejects_non_read_statements() {
        let (_dir, mut db) = open_fixture();
        let err = db.read("INSERT INTO t VALUES(1)").unwrap_err();
        assert!(matches!(err, QuorumError::InvalidQuery { .. }));
        assert_eq!(db.last_error(), "not a read query: INSERT");
    }

    #[test]
    fn read_one_returns_cell_or_empty() {
        let (_dir, mut db) = open_fixture();
        assert_eq!(db.read_one("SELECT 40 + 2").unwrap(), "42");
        assert_eq!(db.read_one("SELECT v FROM t").unwrap(), "");
        assert_eq!(db.read_one("SELECT NULL").unwrap(), "");
    }

    #[test]
    fn write_accumulates_with_terminators() {
        let (_dir, mut db) = open_fixture();
        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(1)").unwrap();
        db.write("INSERT INTO t VALUES(2);").unwrap();
        assert_eq!(
            db.uncommitted_query(),
            "INSERT INTO t VALUES(1);INSERT INTO t VALUES(2);"
        );
        assert_eq!(db.last_write_change_count(), 1);
        db.rollback();
    }

    #[test]
    fn single_commit_lifecycle() {
        let (_dir, mut db) = open_fixture();

        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(1);").unwrap();
        db.prepare().unwrap();
        assert!(db.holds_commit_lock());

        let expected = hash::chain_hash("", "INSERT INTO t VALUES(1);");
        assert_eq!(db.uncommitted_hash(), expected);
        assert_eq!(db.commit_count(), CommitId::ZERO);

        db.commit().unwrap();
        assert!(!db.inside_transaction());
        assert!(!db.holds_commit_lock());
        assert_eq!(db.commit_count(), CommitId::new(1));
        assert_eq!(db.committed_hash(), expected);
        assert_eq!(db.uncommitted_hash(), "");
        assert_eq!(db.uncommitted_query(), "");

        let entry = db.get_commit(CommitId::new(1)).unwrap().unwrap();
        assert_eq!(entry.query, "INSERT INTO t VALUES(1);");
        assert_eq!(entry.hash, expected);

        let drained = db.drain_committed_transactions();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[&CommitId::new(1)], entry);
    }

    #[test]
    fn rollback_after_prepare_is_pure() {
        let (_dir, mut db) = open_fixture();

        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(1);").unwrap();
        db.prepare().unwrap();
        db.rollback();

        assert!(!db.inside_transaction());
        assert!(!db.holds_commit_lock());
        assert_eq!(db.uncommitted_query(), "");
        assert_eq!(db.uncommitted_hash(), "");
        assert_eq!(db.commit_count(), CommitId::ZERO);
        assert!(db.get_commit(CommitId::new(1)).unwrap().is_none());
        assert!(db.drain_committed_transactions().is_empty());

        // The abandoned id is claimed by the next prepare, not skipped.
        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(2);").unwrap();
        db.prepare().unwrap();
        db.commit().unwrap();
        assert_eq!(db.commit_count(), CommitId::new(1));
    }

    #[test]
    fn rollback_outside_transaction_is_a_no_op() {
        let (_dir, mut db) = open_fixture();
        db.rollback();
        db.rollback();
        assert!(!db.inside_transaction());
    }

    #[test]
    fn empty_transaction_still_commits_and_chains() {
        let (_dir, mut db) = open_fixture();
        db.begin().unwrap();
        db.prepare().unwrap();
        db.commit().unwrap();

        assert_eq!(db.commit_count(), CommitId::new(1));
        assert_eq!(db.committed_hash(), hash::chain_hash("", ""));
    }

    #[test]
    fn reopen_recovers_commit_head() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("test.db"));

        let first = Arc::new(CommitCoordinator::new());
        let mut db = Database::open(&config, first).unwrap();
        db.verify_table("t", "CREATE TABLE t (v INTEGER)").unwrap();
        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(1);").unwrap();
        db.prepare().unwrap();
        db.commit().unwrap();
        let head_hash = db.committed_hash();
        drop(db);

        // A fresh process (fresh coordinator) picks the head up from disk.
        let second = Arc::new(CommitCoordinator::new());
        let db = Database::open(&config, second).unwrap();
        assert_eq!(db.commit_count(), CommitId::new(1));
        assert_eq!(db.committed_hash(), head_hash);
    }

    #[test]
    fn last_insert_rowid_and_change_counts() {
        let (_dir, mut db) = open_fixture();
        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(7);").unwrap();
        assert_eq!(db.last_insert_rowid(), 1);
        db.write("INSERT INTO t VALUES(8), (9);").unwrap();
        assert_eq!(db.last_write_change_count(), 2);
        assert!(db.change_count().unwrap() >= 3);
        db.prepare().unwrap();
        db.commit().unwrap();
    }

    #[test]
    fn timing_is_reset_per_transaction() {
        let (_dir, mut db) = open_fixture();
        db.begin().unwrap();
        db.write("INSERT INTO t VALUES(1);").unwrap();
        db.prepare().unwrap();
        db.commit().unwrap();
        let first = db.last_transaction_timing();
        assert_eq!(first.rollback, std::time::Duration::ZERO);

        db.begin().unwrap();
        db.rollback();
        let second = db.last_transaction_timing();
        assert_eq!(second.write, std::time::Duration::ZERO);
        assert_eq!(second.commit, std::time::Duration::ZERO);
    }

    #[test]
    fn schema_mismatch_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE journal (id INTEGER)").unwrap();
        drop(conn);

        let err = Database::open(
            &DatabaseConfig::new(&path),
            Arc::new(CommitCoordinator::new()),
        )
        .unwrap_err();
        assert!(matches!(err, QuorumError::SchemaMismatch { table, .. } if table == "journal"));
    }
}
