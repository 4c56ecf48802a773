/*!
 * SQLite persistence.
 *
 * This module provides storage for:
 * - Finalized definitions (the default `DefinitionSink`)
 * - Terminal dependency records, used to seed the store of the next run
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{DefinitionRow, DependencyRow};
pub use repository::Repository;
