//! Versioned schema steps for the GMAO database.
//!
//! The schema version lives in `PRAGMA user_version`. Steps are listed in
//! ascending order, each one an embedded SQL file; released steps are never
//! edited, only appended to.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

/// `(version, name, sql)` for every known step.
const STEPS: [(u32, &str, &str); 5] = [
    (1, "referential", include_str!("0001_referential.sql")),
    (2, "saisies", include_str!("0002_saisies.sql")),
    (3, "anomalies", include_str!("0003_anomalies.sql")),
    (4, "rbac", include_str!("0004_rbac.sql")),
    (5, "objectifs", include_str!("0005_objectifs.sql")),
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    STEPS.iter().map(|(version, _, _)| *version).max().unwrap_or(0)
}

/// Schema version recorded in the database file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings the schema up to `latest_version()` inside one transaction.
///
/// Fails with `UnsupportedSchemaVersion` when the file was written by a
/// newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<_> = STEPS.iter().filter(|(version, _, _)| *version > from).collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=skipped version={from}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, name, sql) in pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        debug!("event=db_migrate module=db status=applied version={version} name={name}");
    }
    tx.commit()?;
    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, STEPS};
    use rusqlite::Connection;

    #[test]
    fn steps_start_at_one_and_increase() {
        let versions: Vec<u32> = STEPS.iter().map(|(version, _, _)| *version).collect();
        let expected: Vec<u32> = (1..=STEPS.len() as u32).collect();
        assert_eq!(versions, expected);
        assert_eq!(latest_version(), 5);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }
}
