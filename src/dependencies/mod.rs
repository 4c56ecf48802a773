/*!
 * Template and module dependencies.
 *
 * This module contains the dependency model and the machinery that keeps
 * bodies available to the rest of the crate:
 * - `store`: shared cache of dependency records with one in-flight fetch per name
 * - `scan`: discovery of dependency names in text, template bodies and module bodies
 * - `resolver`: transitive resolution with cycle suppression
 */

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::markup::normalize_title;

pub mod resolver;
pub mod scan;
pub mod store;

pub use resolver::{DependencyResolver, ResolutionResult};
pub use store::{DependencyCounts, DependencyStore};

/// The two kinds of invocable dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Text-substitution template, invoked as `{{name|...}}`
    Template,
    /// Scripted module, invoked as `{{#invoke:name|...}}`
    Module,
}

impl DependencyKind {
    /// Namespace prefix used for page titles of this kind
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Template => "Template",
            Self::Module => "Module",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

impl FromStr for DependencyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "template" => Ok(Self::Template),
            "module" => Ok(Self::Module),
            other => Err(anyhow::anyhow!("Unknown dependency kind: {}", other)),
        }
    }
}

/// Normalised identifier of a template or module.
///
/// Equality, hashing and ordering use the kind and the lower-cased title,
/// so `{{Given_name}}` and `{{given name}}` name the same dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyName {
    kind: DependencyKind,
    title: String,
    key: String,
}

impl DependencyName {
    /// Build a name from a raw title, dropping any namespace prefix
    pub fn new(kind: DependencyKind, raw: &str) -> Self {
        let title = normalize_title(raw);
        let title = match title.split_once(':') {
            Some((namespace, rest))
                if namespace.trim().eq_ignore_ascii_case(kind.namespace()) =>
            {
                rest.trim().to_string()
            }
            _ => title,
        };
        let key = title.to_lowercase();
        Self { kind, title, key }
    }

    /// A template dependency
    pub fn template(raw: &str) -> Self {
        Self::new(DependencyKind::Template, raw)
    }

    /// A module dependency
    pub fn module(raw: &str) -> Self {
        Self::new(DependencyKind::Module, raw)
    }

    /// Kind of dependency
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Title as spelled at first sight, without namespace
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Case-folded title used for comparisons
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full page title including namespace, e.g. `Template:given name`
    pub fn page_title(&self) -> String {
        format!("{}:{}", self.kind.namespace(), self.title)
    }
}

impl PartialEq for DependencyName {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.key == other.key
    }
}

impl Eq for DependencyName {}

impl Hash for DependencyName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.key.hash(state);
    }
}

impl PartialOrd for DependencyName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyName {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.kind, &self.key).cmp(&(other.kind, &other.key))
    }
}

impl fmt::Display for DependencyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.namespace(), self.title)
    }
}

/// Availability of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyStatus {
    /// Not yet known, or the last fetch failed transiently
    Pending,
    /// Body is available
    Fetched,
    /// The source answered that the page does not exist
    ConfirmedMissing,
}

impl DependencyStatus {
    /// Whether the status can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Name stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::ConfirmedMissing => "missing",
        }
    }
}

impl FromStr for DependencyStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "fetched" => Ok(Self::Fetched),
            "missing" => Ok(Self::ConfirmedMissing),
            other => Err(anyhow::anyhow!("Unknown dependency status: {}", other)),
        }
    }
}

/// Everything the store knows about one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// The dependency
    pub name: DependencyName,
    /// Body text, present only when fetched
    pub body: Option<String>,
    /// Current status
    pub status: DependencyStatus,
    /// SHA-256 of the body, hex encoded
    pub content_hash: Option<String>,
    /// Fetch attempts made this run
    pub attempts: u32,
    /// Message of the last transient failure
    pub last_error: Option<String>,
}

impl DependencyRecord {
    /// A record nothing is known about yet
    pub fn pending(name: DependencyName) -> Self {
        Self {
            name,
            body: None,
            status: DependencyStatus::Pending,
            content_hash: None,
            attempts: 0,
            last_error: None,
        }
    }

    /// A record holding a fetched body
    pub fn fetched(name: DependencyName, body: String) -> Self {
        Self {
            name,
            content_hash: Some(content_hash(&body)),
            body: Some(body),
            status: DependencyStatus::Fetched,
            attempts: 0,
            last_error: None,
        }
    }

    /// A record for a page that does not exist
    pub fn confirmed_missing(name: DependencyName) -> Self {
        Self {
            status: DependencyStatus::ConfirmedMissing,
            ..Self::pending(name)
        }
    }
}

/// Hex-encoded SHA-256 of a body
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}
