/*!
 * Database schema definitions and migrations.
 *
 * Two tables: finalized definitions, and the terminal dependency records
 * used to seed the store of the next run.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked while a run writes
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // One row per definition line; re-processing an entry replaces its rows
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS definitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry TEXT NOT NULL,
            part_of_speech TEXT NOT NULL,
            sense_number INTEGER NOT NULL,
            sense_id TEXT,
            etymology INTEGER,
            raw_text TEXT NOT NULL,
            normalized_text TEXT,
            outcome TEXT NOT NULL,
            unresolved TEXT NOT NULL DEFAULT '[]',
            examples TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            UNIQUE(entry, sense_number)
        );

        CREATE INDEX IF NOT EXISTS idx_definitions_entry ON definitions(entry);
        CREATE INDEX IF NOT EXISTS idx_definitions_outcome ON definitions(outcome);
        "#,
    )?;

    // Terminal dependency records only
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS dependencies (
            kind TEXT NOT NULL,
            key TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            status TEXT NOT NULL,
            content_hash TEXT,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (kind, key)
        );

        CREATE INDEX IF NOT EXISTS idx_dependencies_status ON dependencies(status);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    if current == 1 {
        // v2: sense ids, etymology numbers and usage examples
        conn.execute_batch(
            r#"
            ALTER TABLE definitions ADD COLUMN sense_id TEXT;
            ALTER TABLE definitions ADD COLUMN etymology INTEGER;
            ALTER TABLE definitions ADD COLUMN examples TEXT NOT NULL DEFAULT '[]';
            "#,
        )
        .context("Failed to migrate definitions table to v2")?;
        current = 2;
    }

    if current != SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unknown schema version: {}. Cannot migrate.",
            from_version
        ));
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}
