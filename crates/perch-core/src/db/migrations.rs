//! Database migrations

use crate::error::Result;
use crate::models::EntityKind;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    debug_assert!(get_version(conn)? == CURRENT_VERSION);
    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: schema_version table plus one document table per
/// syncable entity kind. Type-specific fields live in the JSON payload; the
/// sync quintuple is broken out into indexed columns.
fn migrate_v1(conn: &Connection) -> Result<()> {
    let tx_sql = {
        let mut statements = vec![String::from(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
        )];

        for kind in EntityKind::SYNC_ORDER {
            let table = kind.table();
            statements.push(format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    payload TEXT NOT NULL,
                    sync_status TEXT NOT NULL,
                    row_version INTEGER NOT NULL,
                    last_synced_at INTEGER,
                    deleted_at INTEGER,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ));
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_status ON {table}(sync_status)"
            ));
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_updated ON {table}(updated_at DESC)"
            ));
        }

        statements.push(String::from(
            "INSERT INTO schema_version (version) VALUES (1)",
        ));
        statements.join(";\n")
    };

    conn.execute_batch(&format!("BEGIN;\n{tx_sql};\nCOMMIT;"))?;
    Ok(())
}
