/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};

use crate::dependencies::{DependencyKind, DependencyName, DependencyRecord, DependencyStatus};
use crate::processor::{DefinitionOutcome, ProcessedDefinition};

/// Stored definition row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRow {
    /// Database ID
    pub id: i64,
    /// Page title
    pub entry: String,
    pub part_of_speech: String,
    pub sense_number: i64,
    /// Id from `{{senseid}}`, when the line carries one
    pub sense_id: Option<String>,
    pub etymology: Option<i64>,
    /// Markup as extracted
    pub raw_text: String,
    /// Plain text; absent for definitions left pending
    pub normalized_text: Option<String>,
    pub outcome: DefinitionOutcome,
    /// Dependency titles that were unavailable
    pub unresolved: Vec<String>,
    /// Usage examples, stored as a JSON array
    pub examples: Vec<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl DefinitionRow {
    /// Row for a processed definition (without database ID)
    pub fn from_processed(definition: ProcessedDefinition) -> Self {
        Self {
            id: 0, // Assigned by the database
            entry: definition.entry,
            part_of_speech: definition.part_of_speech,
            sense_number: definition.sense_number as i64,
            sense_id: definition.sense_id,
            etymology: definition.etymology.map(i64::from),
            raw_text: definition.raw_text,
            normalized_text: definition.normalized,
            outcome: definition.outcome,
            unresolved: definition.unresolved,
            examples: definition.examples,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the row carries rendered text
    pub fn is_rendered(&self) -> bool {
        self.normalized_text.is_some()
    }
}

/// Stored dependency row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRow {
    pub kind: String,
    /// Case-folded title, part of the primary key
    pub key: String,
    pub title: String,
    pub body: Option<String>,
    pub status: String,
    pub content_hash: Option<String>,
    pub attempts: i64,
    pub last_error: Option<String>,
}

impl From<&DependencyRecord> for DependencyRow {
    fn from(record: &DependencyRecord) -> Self {
        Self {
            kind: record.name.kind().namespace().to_lowercase(),
            key: record.name.key().to_string(),
            title: record.name.title().to_string(),
            body: record.body.clone(),
            status: record.status.as_str().to_string(),
            content_hash: record.content_hash.clone(),
            attempts: i64::from(record.attempts),
            last_error: record.last_error.clone(),
        }
    }
}

impl DependencyRow {
    /// Convert back into a store record
    pub fn into_record(self) -> anyhow::Result<DependencyRecord> {
        let kind: DependencyKind = self.kind.parse()?;
        let status: DependencyStatus = self.status.parse()?;
        Ok(DependencyRecord {
            name: DependencyName::new(kind, &self.title),
            body: self.body,
            status,
            content_hash: self.content_hash,
            attempts: u32::try_from(self.attempts).unwrap_or(0),
            last_error: self.last_error,
        })
    }
}
