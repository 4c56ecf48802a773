/*!
 * Transitive dependency resolution.
 *
 * The resolver walks the dependency graph level by level: every name of the
 * current frontier is ensured concurrently through the store, fetched bodies
 * are scanned for further names, and a visited set keeps cycles and
 * duplicates out of the next frontier.
 */

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::debug;
use serde::Serialize;

use crate::dependencies::scan::{scan_body, scan_text};
use crate::dependencies::{DependencyName, DependencyStatus, DependencyStore};
use crate::fetchers::Fetcher;

/// Default bound on the number of levels walked below the direct names
pub const DEFAULT_MAX_DEPTH: usize = 25;

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// True when nothing is pending and no direct name is confirmed missing
    pub resolved: bool,
    /// Names invoked directly by the text
    pub required: BTreeSet<DependencyName>,
    /// Names anywhere in the closure that ended this pass pending
    pub missing: BTreeSet<DependencyName>,
    /// Direct names the source says do not exist
    pub confirmed_missing: BTreeSet<DependencyName>,
}

impl ResolutionResult {
    /// Whether a later pass could still change the outcome
    pub fn is_retryable(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Resolves the dependencies of texts through a shared store
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    store: DependencyStore,
    fetcher: Arc<dyn Fetcher>,
    fetch_timeout: Duration,
    max_depth: usize,
}

impl DependencyResolver {
    /// Create a resolver over a store and a fetch collaborator
    pub fn new(store: DependencyStore, fetcher: Arc<dyn Fetcher>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetcher,
            fetch_timeout,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how many levels below the direct names are walked
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The store this resolver writes through
    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    /// Resolve every dependency invoked by `text`
    pub async fn resolve(&self, text: &str) -> ResolutionResult {
        self.resolve_names(scan_text(text)).await
    }

    /// Resolve a known set of names and everything they depend on
    pub async fn resolve_names(&self, required: BTreeSet<DependencyName>) -> ResolutionResult {
        let mut visited: HashSet<DependencyName> = required.iter().cloned().collect();
        let mut frontier: Vec<DependencyName> = required.iter().cloned().collect();
        let mut missing = BTreeSet::new();
        let mut truncated = false;
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth > self.max_depth {
                debug!("Dependency walk stopped at depth {} with {} names left", depth, frontier.len());
                truncated = true;
                break;
            }

            let statuses = join_all(
                frontier
                    .iter()
                    .map(|name| self.store.ensure(name, self.fetcher.clone(), self.fetch_timeout)),
            )
            .await;

            let mut next = Vec::new();
            for (name, status) in frontier.iter().zip(statuses) {
                match status {
                    DependencyStatus::Pending => {
                        missing.insert(name.clone());
                    }
                    DependencyStatus::ConfirmedMissing => {}
                    DependencyStatus::Fetched => {
                        if self.store.is_closed(name) {
                            continue;
                        }
                        let Some(body) = self.store.body(name) else {
                            continue;
                        };
                        for dependency in scan_body(name.kind(), &body) {
                            if visited.insert(dependency.clone()) {
                                next.push(dependency);
                            }
                        }
                    }
                }
            }

            frontier = next;
            depth += 1;
        }

        if missing.is_empty() && !truncated {
            self.store.mark_closed(visited.iter());
        }

        let confirmed_missing: BTreeSet<_> = required
            .iter()
            .filter(|name| self.store.status(name) == Some(DependencyStatus::ConfirmedMissing))
            .cloned()
            .collect();
        let resolved = missing.is_empty() && confirmed_missing.is_empty();

        debug!(
            "Resolved {} direct names ({} visited): {} pending, {} confirmed missing",
            required.len(),
            visited.len(),
            missing.len(),
            confirmed_missing.len()
        );

        ResolutionResult {
            resolved,
            required,
            missing,
            confirmed_missing,
        }
    }
}
