/*!
 * Fetch collaborators for template and module bodies.
 *
 * This module contains the fetcher abstraction and its implementations:
 * - Wiktionary: MediaWiki query API over HTTP
 * - Mock: scripted outcomes for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::dependencies::DependencyName;

/// Result of asking a source for one dependency body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body text
    Found(String),
    /// The source says the page does not exist
    NotFound,
    /// The fetch failed in a way worth retrying later
    TransientError(String),
}

/// Common trait for every body source
///
/// Implementations must map "page does not exist" to [`FetchOutcome::NotFound`]
/// and every other failure to [`FetchOutcome::TransientError`].
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Fetch the body of one dependency
    ///
    /// # Arguments
    /// * `name` - The dependency to fetch; its kind selects the namespace
    ///
    /// # Returns
    /// * `FetchOutcome` - The tri-state outcome
    async fn fetch(&self, name: &DependencyName) -> FetchOutcome;
}

pub mod mock;
pub mod wiktionary;

pub use mock::MockFetcher;
pub use wiktionary::WiktionaryFetcher;
