//! Statement authorizer for whitelisted (restrictive-mode) handles.
//!
//! The engine consults the authorizer during statement compilation. With a
//! whitelist installed, only reads of listed `(table, column)` pairs go
//! through; every write, DDL, `ATTACH`, `PRAGMA`, savepoint, and known
//! side-effectful function is denied, which aborts compilation with the
//! engine's authorization error. Note that this filters *every* statement
//! the handle compiles, internal journal lookups included; a whitelisted
//! handle is for guarded user reads, not coordination work.

use std::sync::Arc;

use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::Connection;

use quorumlite_types::ReadWhitelist;

/// SQL functions the engine will happily run from a bare SELECT but that
/// reach outside the snapshot. The authorizer cannot see purity, so these
/// are denied by name.
const DENIED_FUNCTIONS: &[&str] = &[
    "edit",
    "fts3_tokenizer",
    "load_extension",
    "readfile",
    "writefile",
    "zipfile",
];

/// Install the whitelist filter on a connection.
pub(crate) fn install(conn: &Connection, whitelist: Arc<ReadWhitelist>) {
    conn.authorizer(Some(move |context: AuthContext<'_>| {
        decide(&whitelist, &context.action)
    }));
}

/// Remove any installed filter, returning the connection to full access.
pub(crate) fn clear(conn: &Connection) {
    conn.authorizer(None::<fn(AuthContext<'_>) -> Authorization>);
}

fn decide(whitelist: &ReadWhitelist, action: &AuthAction<'_>) -> Authorization {
    match action {
        AuthAction::Select | AuthAction::Recursive => Authorization::Allow,
        AuthAction::Read {
            table_name,
            column_name,
        } => {
            if whitelist.allows(table_name, column_name) {
                Authorization::Allow
            } else {
                Authorization::Deny
            }
        }
        // BEGIN/COMMIT/ROLLBACK themselves are harmless; the writes they
        // would carry are denied individually.
        AuthAction::Transaction { .. } => Authorization::Allow,
        AuthAction::Function { function_name, .. } => {
            if DENIED_FUNCTIONS.contains(&function_name.to_lowercase().as_str()) {
                Authorization::Deny
            } else {
                Authorization::Allow
            }
        }
        _ => Authorization::Deny,
    }
}
