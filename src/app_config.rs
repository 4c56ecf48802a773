use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language section the extractor reads
    #[serde(default)]
    pub language: LanguageConfig,

    /// Fetch collaborator settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Resolution and rewriting settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Database and report locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Which language section of each page is extracted
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LanguageConfig {
    /// Section header name, e.g. "English"
    #[serde(default = "default_language_name")]
    pub name: String,

    /// Code used in headword templates, e.g. "en"
    #[serde(default = "default_language_code")]
    pub code: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            name: default_language_name(),
            code: default_language_code(),
        }
    }
}

/// Template and module fetching
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FetchConfig {
    /// MediaWiki API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport-level retries per fetch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay, doubled per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum number of concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

impl FetchConfig {
    /// Longest a single dependency fetch may take, every retry and backoff included
    pub fn fetch_budget(&self) -> Duration {
        let attempts = u64::from(self.max_retries) + 1;
        let backoff_ms: u64 = (1..=self.max_retries)
            .map(|attempt| self.retry_backoff_ms.saturating_mul(1u64 << (attempt - 1).min(16)))
            .fold(0, u64::saturating_add);
        Duration::from_secs(self.timeout_secs.saturating_mul(attempts)) + Duration::from_millis(backoff_ms)
    }
}

/// Resolution, rewriting and retry settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Definitions processed at once
    #[serde(default = "default_concurrent_definitions")]
    pub concurrent_definitions: usize,

    /// Fixed-point iteration ceiling of the normalizer
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Resolution retries before a pending definition is finalized
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    /// Delay between retry rounds
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Levels of the dependency graph walked below direct names
    #[serde(default = "default_max_dependency_depth")]
    pub max_dependency_depth: usize,

    /// Stop after this many pages
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrent_definitions: default_concurrent_definitions(),
            max_iterations: default_max_iterations(),
            retry_ceiling: default_retry_ceiling(),
            retry_interval_ms: default_retry_interval_ms(),
            max_dependency_depth: default_max_dependency_depth(),
            limit: None,
        }
    }
}

/// Output locations
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// SQLite database; defaults to the user data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Directory run reports are written to
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            reports_dir: default_reports_dir(),
        }
    }
}

impl StorageConfig {
    /// Database path, falling back to `<local data dir>/wikigloss/wikigloss.db`
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        crate::database::DatabaseConnection::default_database_path()
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_language_name() -> String {
    "English".to_string()
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_api_url() -> String {
    "https://en.wiktionary.org/w/api.php".to_string()
}

fn default_user_agent() -> String {
    format!("wikigloss/{} (dictionary gloss extraction)", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_concurrent_requests() -> usize {
    8
}

fn default_concurrent_definitions() -> usize {
    16
}

fn default_max_iterations() -> usize {
    10
}

fn default_retry_ceiling() -> u32 {
    5
}

fn default_retry_interval_ms() -> u64 {
    2000
}

fn default_max_dependency_depth() -> usize {
    25
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Config {
    /// Load the configuration file, writing a default one when it is absent
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.language.name.trim().is_empty() {
            return Err(anyhow!("Language name must not be empty"));
        }
        if crate::language_utils::get_language_name(&self.language.code).is_err() {
            warn!("Language code '{}' is not a known ISO 639 code", self.language.code);
        }

        url::Url::parse(&self.fetch.api_url)
            .with_context(|| format!("Invalid API URL: {}", self.fetch.api_url))?;

        if self.fetch.timeout_secs == 0 {
            return Err(anyhow!("Fetch timeout must be greater than zero"));
        }
        if self.fetch.concurrent_requests == 0 || self.processing.concurrent_definitions == 0 {
            return Err(anyhow!("Concurrency settings must be greater than zero"));
        }
        if self.processing.max_iterations == 0 {
            return Err(anyhow!("The rewrite iteration ceiling must be greater than zero"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            language: LanguageConfig::default(),
            fetch: FetchConfig::default(),
            processing: ProcessingConfig::default(),
            storage: StorageConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
