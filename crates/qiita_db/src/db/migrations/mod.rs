//! Embedded Qiita schema, applied by version.
//!
//! # Responsibility
//! - Ship the study-record, parameter and vocabulary tables with the binary.
//! - Bring a connection from its stored version up to `latest_version()`.
//!
//! # Invariants
//! - Versions in `MIGRATIONS` are strictly increasing.
//! - `PRAGMA user_version` always equals the last applied version.
//! - Pending migrations are applied in one transaction: all or none.
//! - Seeded vocabularies and default parameter sets live in the SQL files.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "study_records",
        sql: include_str!("0001_study_records.sql"),
    },
    Migration {
        version: 2,
        name: "parameter_tables",
        sql: include_str!("0002_parameter_tables.sql"),
    },
    Migration {
        version: 3,
        name: "vocabularies",
        sql: include_str!("0003_vocabularies.sql"),
    },
];

/// Schema version this binary migrates databases to.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies every migration newer than the stored schema version.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the database was written by a newer
///   binary.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stored = schema_version(conn)?;
    let latest = latest_version();
    if stored > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stored,
            latest_supported: latest,
        });
    }

    let mut pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > stored)
        .peekable();
    if pending.peek().is_none() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        debug!(
            "event=db_migrate module=db status=applied version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={stored} to_version={latest}");
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
