//! The sharded append-only journal.
//!
//! Every committed transaction leaves one row `(id, query, hash)` in some
//! journal shard. A handle appends only to its own shard, so concurrent
//! writers never contend on journal rows; lookups union every shard back
//! into the single logical commit sequence. The unnumbered `journal` table
//! always exists, numbered shards are `journal0000`, `journal0001`, ...

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use quorumlite_error::{QuorumError, Result};
use quorumlite_types::{CommitId, CommitRecord, JournalEntry, JournalShard};

/// Column list shared by every journal shard.
const JOURNAL_COLUMNS: &str = "(id INTEGER PRIMARY KEY, query TEXT, hash TEXT)";

/// The exact `CREATE` text of a journal shard; schema verification compares
/// against this verbatim.
#[must_use]
pub fn create_sql(table: &str) -> String {
    format!("CREATE TABLE {table} {JOURNAL_COLUMNS}")
}

/// Compose a query over every journal shard.
///
/// For each table name, `parts` are joined with that name as the
/// separator; with `append` the name is also appended at the end. The
/// per-shard strings are joined with `UNION`. Example: parts
/// `["SELECT * FROM", "WHERE id > 1"]` over shards `journal` and
/// `journal0000` yield
/// `SELECT * FROM journal WHERE id > 1 UNION SELECT * FROM journal0000
/// WHERE id > 1`.
#[must_use]
pub fn union_query(tables: &[String], parts: &[&str], append: bool) -> String {
    let subqueries: Vec<String> = tables
        .iter()
        .map(|table| {
            let mut subquery = parts.join(&format!(" {table} "));
            if append {
                subquery.push(' ');
                subquery.push_str(table);
            }
            subquery
        })
        .collect();
    subqueries.join(" UNION ")
}

fn id_param(id: CommitId) -> Result<i64> {
    i64::try_from(id.get())
        .map_err(|_| QuorumError::internal(format!("commit id {id} exceeds the engine's range")))
}

/// One handle's view of the journal: its own shard plus the full shard
/// list used for reads.
#[derive(Debug)]
pub struct Journal {
    own_table: String,
    all_tables: Vec<String>,
    max_size: u64,
    size: u64,
}

impl Journal {
    /// Build the shard list for a handle that appends to `shard` and must
    /// see numbered shards up to `max_required`.
    #[must_use]
    pub fn new(shard: JournalShard, max_required: Option<u16>, max_size: u64) -> Self {
        let own_table = shard.table_name();
        let mut all_tables = vec![JournalShard::Base.table_name()];
        if let Some(max) = max_required {
            all_tables.extend((0..=max).map(|n| JournalShard::Numbered(n).table_name()));
        }
        if !all_tables.contains(&own_table) {
            all_tables.push(own_table.clone());
        }
        Self {
            own_table,
            all_tables,
            max_size,
            size: 0,
        }
    }

    /// The shard this handle appends to.
    #[must_use]
    pub fn own_table(&self) -> &str {
        &self.own_table
    }

    /// Every shard visible to reads, own shard included.
    #[must_use]
    pub fn tables(&self) -> &[String] {
        &self.all_tables
    }

    /// Verify or create every shard in scope. A shard that exists with the
    /// wrong schema fails the whole operation.
    pub fn ensure_schema(&self, conn: &Connection) -> Result<()> {
        for table in &self.all_tables {
            crate::schema::verify_table(conn, table, &create_sql(table))?;
        }
        Ok(())
    }

    /// Count the rows currently in the own shard; seeds truncation
    /// bookkeeping at open.
    pub fn load_size(&mut self, conn: &Connection) -> Result<u64> {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.own_table), [], |row| {
                row.get(0)
            })
            .map_err(QuorumError::from)?;
        self.size = u64::try_from(count).unwrap_or(0);
        Ok(self.size)
    }

    /// Append a journal row to the own shard. Runs inside the caller's
    /// open transaction, so an engine rollback also removes the row.
    pub fn append(&mut self, conn: &Connection, id: CommitId, query: &str, hash: &str) -> Result<()> {
        conn.execute(
            &format!("INSERT INTO {} VALUES (?1, ?2, ?3)", self.own_table),
            params![id_param(id)?, query, hash],
        )
        .map_err(QuorumError::from)?;
        self.size += 1;
        Ok(())
    }

    /// Undo the bookkeeping of an append whose transaction rolled back.
    pub fn note_rollback(&mut self) {
        self.size = self.size.saturating_sub(1);
    }

    /// Whether the own shard has outgrown its retention window.
    #[must_use]
    pub fn needs_truncation(&self) -> bool {
        self.max_size > 0 && self.size > self.max_size
    }

    /// Rows retained in the own shard before pruning; `0` disables it.
    #[must_use]
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Delete own-shard rows with ids strictly below `floor`. The caller
    /// is responsible for never passing a floor above the oldest commit
    /// still awaiting drain.
    pub fn truncate_below(&mut self, conn: &Connection, floor: CommitId) -> Result<()> {
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE id < ?1", self.own_table),
                params![id_param(floor)?],
            )
            .map_err(QuorumError::from)?;
        self.size = self.size.saturating_sub(deleted as u64);
        debug!(shard = %self.own_table, deleted, floor = %floor, "truncated journal shard");
        Ok(())
    }

    /// Highest commit id across every shard, or [`CommitId::ZERO`] when
    /// the journal is empty.
    pub fn max_commit_id(&self, conn: &Connection) -> Result<CommitId> {
        let union = union_query(&self.all_tables, &["SELECT MAX(id) AS id FROM"], true);
        let max: Option<i64> = conn
            .query_row(&format!("SELECT MAX(id) FROM ({union})"), [], |row| row.get(0))
            .map_err(QuorumError::from)?;
        Ok(CommitId::new(max.map_or(0, |id| id.unsigned_abs())))
    }

    /// The hash stored with the highest commit id across every shard, or
    /// the empty string when the journal is empty.
    pub fn head_hash(&self, conn: &Connection) -> Result<String> {
        let union = union_query(&self.all_tables, &["SELECT id, hash FROM"], true);
        let hash: Option<String> = conn
            .query_row(
                &format!("SELECT hash FROM ({union}) ORDER BY id DESC LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(QuorumError::from)?;
        Ok(hash.unwrap_or_default())
    }

    /// Look up one commit across every shard.
    pub fn get_commit(&self, conn: &Connection, id: CommitId) -> Result<Option<JournalEntry>> {
        let sql = union_query(
            &self.all_tables,
            &["SELECT query, hash FROM", "WHERE id = ?1"],
            false,
        );
        conn.query_row(&sql, params![id_param(id)?], |row| {
            Ok(JournalEntry {
                query: row.get(0)?,
                hash: row.get(1)?,
            })
        })
        .optional()
        .map_err(QuorumError::from)
    }

    /// Look up an inclusive id range across every shard, ascending.
    pub fn get_commits(
        &self,
        conn: &Connection,
        from: CommitId,
        to: CommitId,
    ) -> Result<Vec<CommitRecord>> {
        let union = union_query(
            &self.all_tables,
            &["SELECT id, query, hash FROM", "WHERE id >= ?1 AND id <= ?2"],
            false,
        );
        let sql = format!("{union} ORDER BY id");
        let mut stmt = conn.prepare(&sql).map_err(QuorumError::from)?;
        let rows = stmt
            .query_map(params![id_param(from)?, id_param(to)?], |row| {
                let id: i64 = row.get(0)?;
                Ok(CommitRecord {
                    id: CommitId::new(id.unsigned_abs()),
                    query: row.get(1)?,
                    hash: row.get(2)?,
                })
            })
            .map_err(QuorumError::from)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(QuorumError::from)?);
        }
        Ok(records)
    }
}
