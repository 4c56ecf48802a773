/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use rusqlite::{Row, params};
use std::path::Path;

use super::connection::{DatabaseConnection, DatabaseStats};
use super::models::{DefinitionRow, DependencyRow};
use crate::dependencies::DependencyRecord;
use crate::processor::{DefinitionOutcome, DefinitionSink, ProcessedDefinition};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.db.stats()
    }

    // =========================================================================
    // Definition Operations
    // =========================================================================

    /// Store processed definitions. A definition already stored for the same
    /// entry and sense is replaced.
    pub async fn save_definitions(&self, definitions: Vec<ProcessedDefinition>) -> Result<usize> {
        if definitions.is_empty() {
            return Ok(0);
        }
        let rows: Vec<DefinitionRow> = definitions.into_iter().map(DefinitionRow::from_processed).collect();

        self.db
            .transaction_async(move |tx| {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO definitions (
                        entry, part_of_speech, sense_number, sense_id, etymology, raw_text,
                        normalized_text, outcome, unresolved, examples, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(entry, sense_number) DO UPDATE SET
                        part_of_speech = excluded.part_of_speech,
                        sense_id = excluded.sense_id,
                        etymology = excluded.etymology,
                        raw_text = excluded.raw_text,
                        normalized_text = excluded.normalized_text,
                        outcome = excluded.outcome,
                        unresolved = excluded.unresolved,
                        examples = excluded.examples,
                        created_at = excluded.created_at
                    "#,
                )?;
                for row in &rows {
                    let unresolved = serde_json::to_string(&row.unresolved)
                        .context("Failed to serialize unresolved dependencies")?;
                    let examples =
                        serde_json::to_string(&row.examples).context("Failed to serialize examples")?;
                    stmt.execute(params![
                        row.entry,
                        row.part_of_speech,
                        row.sense_number,
                        row.sense_id,
                        row.etymology,
                        row.raw_text,
                        row.normalized_text,
                        row.outcome.as_str(),
                        unresolved,
                        examples,
                        row.created_at,
                    ])?;
                }
                debug!("Stored {} definitions", rows.len());
                Ok(rows.len())
            })
            .await
    }

    /// Definitions of one entry, in sense order
    pub async fn definitions_for(&self, entry: &str) -> Result<Vec<DefinitionRow>> {
        let entry = entry.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, entry, part_of_speech, sense_number, sense_id, etymology,
                           raw_text, normalized_text, outcome, unresolved, examples, created_at
                    FROM definitions
                    WHERE entry = ?1
                    ORDER BY sense_number
                    "#,
                )?;

                let rows = stmt.query_map([&entry], definition_from_row)?;
                let definitions: Vec<DefinitionRow> = rows.filter_map(|r| r.ok()).collect();
                Ok(definitions)
            })
            .await
    }

    /// Number of stored definitions per outcome
    pub async fn outcome_counts(&self) -> Result<Vec<(DefinitionOutcome, i64)>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT outcome, COUNT(*) FROM definitions GROUP BY outcome ORDER BY outcome",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;

                let mut counts = Vec::new();
                for row in rows {
                    let (outcome, count) = row?;
                    match outcome.parse() {
                        Ok(outcome) => counts.push((outcome, count)),
                        Err(e) => warn!("Skipping stored outcome: {}", e),
                    }
                }
                Ok(counts)
            })
            .await
    }

    // =========================================================================
    // Dependency Operations
    // =========================================================================

    /// Persist dependency records. Pending records are skipped.
    pub async fn save_dependencies(&self, records: Vec<DependencyRecord>) -> Result<usize> {
        let rows: Vec<DependencyRow> = records
            .iter()
            .filter(|record| record.status.is_terminal())
            .map(DependencyRow::from)
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT OR REPLACE INTO dependencies (
                        kind, key, title, body, status, content_hash,
                        attempts, last_error, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                )?;
                for row in &rows {
                    stmt.execute(params![
                        row.kind,
                        row.key,
                        row.title,
                        row.body,
                        row.status,
                        row.content_hash,
                        row.attempts,
                        row.last_error,
                        now,
                    ])?;
                }
                debug!("Stored {} dependency records", rows.len());
                Ok(rows.len())
            })
            .await
    }

    /// Every persisted dependency record; unreadable rows are skipped
    pub async fn load_dependencies(&self) -> Result<Vec<DependencyRecord>> {
        let rows = self
            .db
            .execute_async(|conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT kind, key, title, body, status, content_hash, attempts, last_error
                    FROM dependencies
                    WHERE status != 'pending'
                    ORDER BY kind, key
                    "#,
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(DependencyRow {
                        kind: row.get(0)?,
                        key: row.get(1)?,
                        title: row.get(2)?,
                        body: row.get(3)?,
                        status: row.get(4)?,
                        content_hash: row.get(5)?,
                        attempts: row.get(6)?,
                        last_error: row.get(7)?,
                    })
                })?;
                let rows: Vec<DependencyRow> = rows.filter_map(|r| r.ok()).collect();
                Ok(rows)
            })
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let key = row.key.clone();
                row.into_record()
                    .map_err(|e| warn!("Skipping stored dependency '{}': {}", key, e))
                    .ok()
            })
            .collect())
    }
}

fn definition_from_row(row: &Row<'_>) -> rusqlite::Result<DefinitionRow> {
    let outcome: String = row.get(8)?;
    let unresolved: String = row.get(9)?;
    let examples: String = row.get(10)?;
    Ok(DefinitionRow {
        id: row.get(0)?,
        entry: row.get(1)?,
        part_of_speech: row.get(2)?,
        sense_number: row.get(3)?,
        sense_id: row.get(4)?,
        etymology: row.get(5)?,
        raw_text: row.get(6)?,
        normalized_text: row.get(7)?,
        outcome: outcome.parse().unwrap_or(DefinitionOutcome::Pending),
        unresolved: serde_json::from_str(&unresolved).unwrap_or_default(),
        examples: serde_json::from_str(&examples).unwrap_or_default(),
        created_at: row.get(11)?,
    })
}

#[async_trait]
impl DefinitionSink for Repository {
    async fn save(&self, definitions: Vec<ProcessedDefinition>) -> Result<()> {
        self.save_definitions(definitions).await?;
        Ok(())
    }
}
