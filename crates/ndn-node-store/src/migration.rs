//! SQLite schema versions.
//!
//! `MIGRATIONS[i]` moves the schema from version `i` to `i + 1`. Pending
//! steps run in one transaction, recorded in `schema_migrations`.

use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};

const MIGRATIONS: &[&str] = &[
    // v1: one table for every node-local value (certificates, app state).
    "CREATE TABLE kv (
        key TEXT PRIMARY KEY,
        value BLOB NOT NULL,
        updated_at INTEGER NOT NULL
    );",
];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

fn applied_version(conn: &Connection) -> Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?)
}

/// Bring `conn` up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let from = applied_version(conn)?;
    if from > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "storage schema v{from} was written by a newer node (this one knows v{CURRENT_VERSION})"
        )));
    }
    if from == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(from as usize) {
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![index as u32 + 1, ndn_node_core::now_millis() as i64],
        )?;
    }
    tx.commit()?;
    tracing::debug!(from, to = CURRENT_VERSION, "migrated storage schema");
    Ok(())
}
