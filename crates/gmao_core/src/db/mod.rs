//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for GMAO core.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Foreign keys are enforced on every connection handed out.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Constraint family reported by SQLite for a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

/// Classifies a SQLite constraint failure, or returns `None` for any other
/// error.
pub fn constraint_violation(err: &rusqlite::Error) -> Option<ConstraintKind> {
    use rusqlite::ffi;

    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    if failure.code != rusqlite::ErrorCode::ConstraintViolation {
        return None;
    }

    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Some(ConstraintKind::Unique)
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintKind::ForeignKey),
        ffi::SQLITE_CONSTRAINT_CHECK => Some(ConstraintKind::Check),
        ffi::SQLITE_CONSTRAINT_NOTNULL => Some(ConstraintKind::NotNull),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{constraint_violation, open_db_in_memory, ConstraintKind};

    #[test]
    fn classifies_unique_and_foreign_key_failures() {
        let conn = open_db_in_memory().unwrap();
        conn.execute("INSERT INTO sites (name) VALUES ('Nord');", [])
            .unwrap();

        let dup = conn
            .execute("INSERT INTO sites (name) VALUES ('NORD');", [])
            .unwrap_err();
        assert_eq!(constraint_violation(&dup), Some(ConstraintKind::Unique));

        let orphan = conn
            .execute(
                "INSERT INTO parcs (name, typeparc_id) VALUES ('P1', 999);",
                [],
            )
            .unwrap_err();
        assert_eq!(
            constraint_violation(&orphan),
            Some(ConstraintKind::ForeignKey)
        );
    }

    #[test]
    fn ignores_non_constraint_errors() {
        let conn = open_db_in_memory().unwrap();
        let err = conn.execute("SELECT * FROM missing_table;", []).unwrap_err();
        assert_eq!(constraint_violation(&err), None);
    }
}
