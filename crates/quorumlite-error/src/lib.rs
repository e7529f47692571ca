use thiserror::Error;

/// Primary error type for QuorumLite operations.
///
/// Structured variants for the coordinator's own failure modes, with the
/// storage engine's errors wrapped rather than stringified so busy/conflict
/// conditions stay distinguishable from hard failures.
#[derive(Error, Debug)]
pub enum QuorumError {
    /// A table exists with a schema other than the one required.
    /// Fatal when raised during handle construction.
    #[error("schema mismatch for table {table}: expected `{expected}`, found `{actual}`")]
    SchemaMismatch {
        table: String,
        expected: String,
        actual: String,
    },

    /// The authorizer rejected a statement.
    #[error("not authorized: {detail}")]
    AuthorizationDenied { detail: String },

    /// `begin` was called while a transaction is already open.
    #[error("cannot start a transaction within a transaction")]
    AlreadyInTransaction,

    /// A write or prepare was attempted outside a transaction.
    #[error("no transaction is active")]
    NotInTransaction,

    /// `commit` was called before `prepare`.
    #[error("cannot commit: transaction has not been prepared")]
    NotPrepared,

    /// A write or second `prepare` was attempted after `prepare`; the
    /// transaction must commit or roll back first.
    #[error("transaction is already prepared")]
    AlreadyPrepared,

    /// The engine reported busy/locked. Retryable: the caller may retry
    /// the failed operation or roll back.
    #[error("database is busy: {detail}")]
    Busy { detail: String },

    /// A write was attempted through a whitelisted (read-only) handle.
    #[error("attempt to write through a read-only handle")]
    ReadOnly,

    /// A statement passed to the read surface is not a read.
    #[error("not a read query: {detail}")]
    InvalidQuery { detail: String },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other storage engine error, surfaced verbatim.
    #[error("storage engine error: {0}")]
    Engine(rusqlite::Error),

    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// SQLite-compatible numeric result codes, used to report commit outcomes
/// to collaborators that speak the engine's integer codes.
///
/// Values match `sqlite3.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Successful result.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Internal logic error.
    Internal = 2,
    /// Access permission denied.
    Perm = 3,
    /// Callback requested abort.
    Abort = 4,
    /// Database file is locked.
    Busy = 5,
    /// A table is locked.
    Locked = 6,
    /// Out of memory.
    NoMem = 7,
    /// Attempt to write a read-only database.
    ReadOnly = 8,
    /// Interrupted.
    Interrupt = 9,
    /// Disk I/O error.
    IoErr = 10,
    /// Database disk image is malformed.
    Corrupt = 11,
    /// Database or disk is full.
    Full = 13,
    /// Unable to open database file.
    CantOpen = 14,
    /// Database schema problem.
    Schema = 17,
    /// String or BLOB exceeds size limit.
    TooBig = 18,
    /// Constraint violation.
    Constraint = 19,
    /// Data type mismatch.
    Mismatch = 20,
    /// Library used incorrectly.
    Misuse = 21,
    /// Authorization denied.
    Auth = 23,
    /// Bind parameter out of range.
    Range = 25,
    /// Not a database file.
    NotADb = 26,
}

impl QuorumError {
    /// Map this error to the engine's numeric result code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::SchemaMismatch { .. } => ErrorCode::Schema,
            Self::AuthorizationDenied { .. } => ErrorCode::Auth,
            Self::AlreadyInTransaction | Self::NotInTransaction => ErrorCode::Error,
            Self::NotPrepared | Self::AlreadyPrepared | Self::InvalidQuery { .. } => {
                ErrorCode::Misuse
            }
            Self::Internal(_) => ErrorCode::Internal,
            Self::Busy { .. } => ErrorCode::Busy,
            Self::ReadOnly => ErrorCode::ReadOnly,
            Self::Io(_) => ErrorCode::IoErr,
            Self::Engine(err) => engine_error_code(err),
        }
    }

    /// Whether retrying the failed operation may succeed without any other
    /// change. Commit conflicts and lock contention are transient; state
    /// machine violations and hard engine failures are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Create an internal error.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Create an invalid-query error.
    pub fn invalid_query(detail: impl Into<String>) -> Self {
        Self::InvalidQuery {
            detail: detail.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema_mismatch(
        table: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

fn engine_error_code(err: &rusqlite::Error) -> ErrorCode {
    use rusqlite::ErrorCode as Raw;
    match err.sqlite_error_code() {
        Some(Raw::InternalMalfunction) => ErrorCode::Internal,
        Some(Raw::PermissionDenied) => ErrorCode::Perm,
        Some(Raw::OperationAborted) => ErrorCode::Abort,
        Some(Raw::DatabaseBusy) => ErrorCode::Busy,
        Some(Raw::DatabaseLocked) => ErrorCode::Locked,
        Some(Raw::OutOfMemory) => ErrorCode::NoMem,
        Some(Raw::ReadOnly) => ErrorCode::ReadOnly,
        Some(Raw::OperationInterrupted) => ErrorCode::Interrupt,
        Some(Raw::SystemIoFailure) => ErrorCode::IoErr,
        Some(Raw::DatabaseCorrupt) => ErrorCode::Corrupt,
        Some(Raw::DiskFull) => ErrorCode::Full,
        Some(Raw::CannotOpen) => ErrorCode::CantOpen,
        Some(Raw::SchemaChanged) => ErrorCode::Schema,
        Some(Raw::TooBig) => ErrorCode::TooBig,
        Some(Raw::ConstraintViolation) => ErrorCode::Constraint,
        Some(Raw::TypeMismatch) => ErrorCode::Mismatch,
        Some(Raw::ApiMisuse) => ErrorCode::Misuse,
        Some(Raw::AuthorizationForStatementDenied) => ErrorCode::Auth,
        Some(Raw::ParameterOutOfRange) => ErrorCode::Range,
        Some(Raw::NotADatabase) => ErrorCode::NotADb,
        _ => ErrorCode::Error,
    }
}

impl From<rusqlite::Error> for QuorumError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode as Raw;
        match err.sqlite_error_code() {
            Some(Raw::DatabaseBusy | Raw::DatabaseLocked) => Self::Busy {
                detail: err.to_string(),
            },
            Some(Raw::AuthorizationForStatementDenied) => Self::AuthorizationDenied {
                detail: err.to_string(),
            },
            _ => Self::Engine(err),
        }
    }
}

/// Result type alias using [`QuorumError`].
pub type Result<T> = std::result::Result<T, QuorumError>;
