/*!
 * The SQLite connection behind the repository.
 *
 * One connection per database file, guarded by a mutex. Queries run on the
 * blocking pool so a run never stalls the async workers on disk I/O.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;

/// Directory under the user's data directory, and the file inside it
const DATA_DIRNAME: &str = "wikigloss";
const DATA_FILENAME: &str = "wikigloss.db";

/// Shared handle to one SQLite database
#[derive(Clone)]
pub struct DatabaseConnection {
    /// `None` for in-memory databases
    file: Option<PathBuf>,
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the database at `path`, creating the file, its parent directory
    /// and the schema as needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening database at: {:?}", path);
        let connection =
            Connection::open(&path).with_context(|| format!("Failed to open database: {:?}", path))?;
        Self::with_schema(connection, Some(path))
    }

    /// A throwaway database that lives as long as the handle
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");
        let connection = Connection::open_in_memory().context("Failed to create in-memory database")?;
        Self::with_schema(connection, None)
    }

    fn with_schema(connection: Connection, file: Option<PathBuf>) -> Result<Self> {
        schema::initialize_schema(&connection)?;
        Ok(Self {
            file,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// `<data dir>/wikigloss/wikigloss.db`, used when the configuration names no path
    pub fn default_database_path() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DATA_DIRNAME).join(DATA_FILENAME))
    }

    /// Run `f` against the connection on the blocking pool
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || f(&connection.lock()))
            .await
            .context("Database task panicked")?
    }

    /// Run `f` inside a transaction on the blocking pool; an error rolls it back
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = connection.lock();
            let tx = connection.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .context("Database transaction task panicked")?
    }

    /// Row counts and file size
    pub fn stats(&self) -> Result<DatabaseStats> {
        let connection = self.connection.lock();
        let count = |sql: &str| -> Result<i64> {
            connection
                .query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("Failed to run: {}", sql))
        };

        Ok(DatabaseStats {
            definition_count: count("SELECT COUNT(*) FROM definitions")?,
            rendered_count: count("SELECT COUNT(*) FROM definitions WHERE normalized_text IS NOT NULL")?,
            dependency_count: count("SELECT COUNT(*) FROM dependencies")?,
            file_size_bytes: self
                .file
                .as_ref()
                .and_then(|file| std::fs::metadata(file).ok())
                .map_or(0, |metadata| metadata.len()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Stored definitions
    pub definition_count: i64,
    /// Definitions with a normalized text
    pub rendered_count: i64,
    /// Persisted dependency records
    pub dependency_count: i64,
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Definitions: {} ({} rendered), Dependencies: {}, Size: {} KB",
            self.definition_count,
            self.rendered_count,
            self.dependency_count,
            self.file_size_bytes / 1024
        )
    }
}
