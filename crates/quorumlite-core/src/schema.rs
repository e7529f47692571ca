//! Schema verification helpers.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use quorumlite_error::{QuorumError, Result};

/// Ensure `name` exists with exactly the schema text `sql`.
///
/// Returns `Ok(true)` if the table was missing and has been created,
/// `Ok(false)` if it already exists with the expected schema. An existing
/// table whose stored `CREATE` text differs is a
/// [`QuorumError::SchemaMismatch`]; the caller decides whether that is
/// fatal (it is during handle construction).
pub fn verify_table(conn: &Connection, name: &str, sql: &str) -> Result<bool> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND tbl_name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()
        .map_err(QuorumError::from)?;

    match existing {
        None => {
            conn.execute_batch(sql).map_err(QuorumError::from)?;
            info!(table = name, "created missing table");
            Ok(true)
        }
        Some(actual) if actual == sql => Ok(false),
        Some(actual) => Err(QuorumError::schema_mismatch(name, sql, actual)),
    }
}

/// Add a column to an existing table.
pub fn add_column(conn: &Connection, table: &str, column: &str, column_type: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "ALTER TABLE {table} ADD COLUMN {column} {column_type}"
    ))
    .map_err(QuorumError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T_SQL: &str = "CREATE TABLE t (id INTEGER PRIMARY KEY, body TEXT)";

    #[test]
    fn creates_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(verify_table(&conn, "t", T_SQL).unwrap());
        // Second call sees the table and leaves it alone.
        assert!(!verify_table(&conn, "t", T_SQL).unwrap());
    }

    #[test]
    fn mismatched_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();

        let err = verify_table(&conn, "t", T_SQL).unwrap_err();
        assert!(matches!(err, QuorumError::SchemaMismatch { table, .. } if table == "t"));
    }

    #[test]
    fn add_column_extends_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();

        add_column(&conn, "t", "note", "TEXT").unwrap();
        conn.execute_batch("INSERT INTO t (id, note) VALUES (1, 'x')")
            .unwrap();

        let err = add_column(&conn, "t", "note", "TEXT").unwrap_err();
        assert!(matches!(err, QuorumError::Engine(_)));
    }
}
