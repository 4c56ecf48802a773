/*!
 * Mock fetcher for testing.
 *
 * The mock serves scripted outcomes keyed by page title:
 * - `with_body()` - the page exists and has this body
 * - `failing_times()` - the first N fetches of a page fail transiently
 * - `always_failing()` - every fetch fails transiently
 * - anything else - the page does not exist
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::dependencies::{DependencyKind, DependencyName};
use crate::fetchers::{FetchOutcome, Fetcher};

/// Scripted fetcher with per-page call counters
#[derive(Debug, Default)]
pub struct MockFetcher {
    /// Bodies by lower-cased page title
    bodies: HashMap<String, String>,
    /// Remaining transient failures by lower-cased page title
    failures: Arc<Mutex<HashMap<String, usize>>>,
    /// Fail every request transiently
    always_failing: bool,
    /// Simulated latency
    delay: Option<Duration>,
    /// Calls by lower-cased page title
    calls: Arc<Mutex<HashMap<String, usize>>>,
    /// Total calls
    total_calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    /// A fetcher for which no page exists
    pub fn new() -> Self {
        Self::default()
    }

    /// A fetcher whose every request fails transiently
    pub fn always_failing() -> Self {
        Self {
            always_failing: true,
            ..Self::default()
        }
    }

    /// Serve `body` for `page_title`, e.g. `Template:lb`
    pub fn with_body(mut self, page_title: &str, body: &str) -> Self {
        self.bodies.insert(page_key(page_title), body.to_string());
        self
    }

    /// Fail the first `times` fetches of `page_title` transiently
    pub fn failing_times(self, page_title: &str, times: usize) -> Self {
        self.failures.lock().insert(page_key(page_title), times);
        self
    }

    /// Wait this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches of one dependency
    pub fn calls(&self, name: &DependencyName) -> usize {
        self.calls
            .lock()
            .get(&page_key(&name.page_title()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of fetches of all dependencies
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

fn page_key(page_title: &str) -> String {
    let kind = if page_title.to_ascii_lowercase().starts_with("module:") {
        DependencyKind::Module
    } else {
        DependencyKind::Template
    };
    DependencyName::new(kind, page_title).page_title().to_lowercase()
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, name: &DependencyName) -> FetchOutcome {
        let key = page_key(&name.page_title());
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().entry(key.clone()).or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.always_failing {
            return FetchOutcome::TransientError("simulated connection reset".to_string());
        }

        {
            let mut failures = self.failures.lock();
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return FetchOutcome::TransientError(format!(
                        "simulated failure for {}",
                        name.page_title()
                    ));
                }
            }
        }

        match self.bodies.get(&key) {
            Some(body) => FetchOutcome::Found(body.clone()),
            None => FetchOutcome::NotFound,
        }
    }
}
