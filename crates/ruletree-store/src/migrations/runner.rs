//! Migration runner
//!
//! Every recorded migration is checked against the embedded SQL before any
//! pending one runs, so an edited migration fails start-up without touching
//! the schema. Each pending migration then runs in its own transaction.

#![allow(clippy::result_large_err)]

use std::collections::HashMap;

use rusqlite::Connection;

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::{get_migrations, Migration};

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    migration_id TEXT NOT NULL UNIQUE,
    applied_at INTEGER NOT NULL,
    checksum TEXT
)";

/// Bring the schema up to date
///
/// # Errors
///
/// Fails on a checksum mismatch or when a migration's SQL fails; a failed
/// migration leaves no partial changes behind.
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute(VERSION_TABLE, []).map_err(from_rusqlite)?;

    let recorded = recorded_checksums(conn)?;
    let mut pending = Vec::new();
    for migration in get_migrations() {
        let checksum = compute_checksum(migration.sql);
        match recorded.get(migration.id) {
            // Rows written without a checksum are trusted as-is
            Some(None) => {}
            Some(Some(expected)) if *expected != checksum => {
                return Err(checksum_mismatch(migration.id, expected, &checksum));
            }
            Some(Some(_)) => {}
            None => pending.push((migration, checksum)),
        }
    }

    for (migration, checksum) in pending {
        run_one(conn, migration, &checksum)?;
    }
    Ok(())
}

/// Ids of the migrations recorded in `schema_version`, in application order
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(ids)
}

fn recorded_checksums(conn: &Connection) -> Result<HashMap<String, Option<String>>> {
    let mut stmt = conn
        .prepare("SELECT migration_id, checksum FROM schema_version")
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

fn run_one(conn: &mut Connection, migration: Migration, checksum: &str) -> Result<()> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()))?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.id, chrono::Utc::now().timestamp(), checksum],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(migration_id = migration.id, "applied migration");
    Ok(())
}
