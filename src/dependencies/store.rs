/*!
 * Dependency store.
 *
 * Shared cache of dependency records for one run. Reads and writes are
 * concurrent; a fetch for a given name is started at most once at a time and
 * concurrent callers await the same in-flight future instead of fetching
 * again.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::dependencies::scan::redirect_target;
use crate::dependencies::{
    DependencyKind, DependencyName, DependencyRecord, DependencyStatus, content_hash,
};
use crate::errors::FetchError;
use crate::fetchers::{FetchOutcome, Fetcher};

type InFlightFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Record counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DependencyCounts {
    /// Records with a body
    pub fetched: usize,
    /// Records the source says do not exist
    pub confirmed_missing: usize,
    /// Records still unknown
    pub pending: usize,
}

/// Cache of template and module records
pub struct DependencyStore {
    /// Records by name
    records: Arc<RwLock<HashMap<DependencyName, DependencyRecord>>>,

    /// Fetches currently running, one per name
    in_flight: Arc<Mutex<HashMap<DependencyName, InFlightFetch>>>,

    /// Names whose whole dependency closure is known to be terminal
    closed: Arc<RwLock<HashSet<DependencyName>>>,

    /// Transient failure messages, in arrival order
    transient_failures: Arc<RwLock<Vec<String>>>,

    /// Number of fetches started
    fetches: Arc<AtomicUsize>,
}

impl DependencyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(RwLock::new(HashSet::new())),
            transient_failures: Arc::new(RwLock::new(Vec::new())),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make sure `name` has a terminal status if the source can give it one.
    ///
    /// Terminal records return immediately. Otherwise the fetch already in
    /// flight for this name is awaited, or a new one is started. Every fetch
    /// is bounded by `timeout`; running out of time counts as a transient
    /// failure. Dropping the returned future before it completes leaves the
    /// record `Pending`.
    pub async fn ensure(
        &self,
        name: &DependencyName,
        fetcher: Arc<dyn Fetcher>,
        timeout: Duration,
    ) -> DependencyStatus {
        if let Some(status) = self.terminal_status(name) {
            return status;
        }

        let fetch = {
            let mut in_flight = self.in_flight.lock();
            // A fetch may have finished between the check above and the lock.
            if let Some(status) = self.terminal_status(name) {
                return status;
            }
            match in_flight.get(name) {
                Some(existing) => existing.clone(),
                None => {
                    self.records
                        .write()
                        .entry(name.clone())
                        .or_insert_with(|| DependencyRecord::pending(name.clone()));
                    let fetch = fetch_and_record(self.clone(), name.clone(), fetcher, timeout)
                        .boxed()
                        .shared();
                    in_flight.insert(name.clone(), fetch.clone());
                    fetch
                }
            }
        };

        fetch.await;
        self.status(name).unwrap_or(DependencyStatus::Pending)
    }

    /// Apply a fetch outcome. Terminal records are never changed.
    pub fn record_outcome(&self, name: &DependencyName, outcome: &FetchOutcome) {
        let mut records = self.records.write();
        let record = records
            .entry(name.clone())
            .or_insert_with(|| DependencyRecord::pending(name.clone()));
        if record.status.is_terminal() {
            return;
        }

        record.attempts += 1;
        match outcome {
            FetchOutcome::Found(body) => {
                debug!("Fetched {} ({} bytes)", name, body.len());
                record.content_hash = Some(content_hash(body));
                record.body = Some(body.clone());
                record.status = DependencyStatus::Fetched;
                record.last_error = None;
            }
            FetchOutcome::NotFound => {
                info!("{} does not exist", name);
                record.status = DependencyStatus::ConfirmedMissing;
                record.last_error = None;
            }
            FetchOutcome::TransientError(message) => {
                warn!("Fetching {} failed (attempt {}): {}", name, record.attempts, message);
                record.last_error = Some(message.clone());
                self.transient_failures
                    .write()
                    .push(format!("{} - {}", name, message));
            }
        }
    }

    /// Load records from an earlier run. Pending records are ignored and
    /// terminal records already present are kept. Returns how many were added.
    pub fn seed<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = DependencyRecord>,
    {
        let mut current = self.records.write();
        let mut added = 0;
        for record in records {
            if !record.status.is_terminal() {
                continue;
            }
            let keep_existing = current
                .get(&record.name)
                .is_some_and(|existing| existing.status.is_terminal());
            if !keep_existing {
                current.insert(record.name.clone(), record);
                added += 1;
            }
        }
        debug!("Seeded dependency store with {} records", added);
        added
    }

    /// A copy of one record
    pub fn get(&self, name: &DependencyName) -> Option<DependencyRecord> {
        self.records.read().get(name).cloned()
    }

    /// Status of one record
    pub fn status(&self, name: &DependencyName) -> Option<DependencyStatus> {
        self.records.read().get(name).map(|record| record.status)
    }

    /// Body of a fetched record
    pub fn body(&self, name: &DependencyName) -> Option<String> {
        self.records.read().get(name).and_then(|record| record.body.clone())
    }

    fn terminal_status(&self, name: &DependencyName) -> Option<DependencyStatus> {
        self.status(name).filter(DependencyStatus::is_terminal)
    }

    /// Every record, ordered by name
    pub fn records(&self) -> Vec<DependencyRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Records worth persisting: everything but `Pending`
    pub fn terminal_records(&self) -> Vec<DependencyRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.status.is_terminal())
            .collect()
    }

    /// Names confirmed not to exist, ordered
    pub fn confirmed_missing(&self) -> Vec<DependencyName> {
        self.names_with(DependencyStatus::ConfirmedMissing)
    }

    /// Names still pending, ordered
    pub fn pending(&self) -> Vec<DependencyName> {
        self.names_with(DependencyStatus::Pending)
    }

    fn names_with(&self, status: DependencyStatus) -> Vec<DependencyName> {
        let mut names: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|record| record.status == status)
            .map(|record| record.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Record counts by status
    pub fn counts(&self) -> DependencyCounts {
        let mut counts = DependencyCounts::default();
        for record in self.records.read().values() {
            match record.status {
                DependencyStatus::Fetched => counts.fetched += 1,
                DependencyStatus::ConfirmedMissing => counts.confirmed_missing += 1,
                DependencyStatus::Pending => counts.pending += 1,
            }
        }
        counts
    }

    /// Template redirects among `names`, as lower-cased alias name to target
    /// title. Names without a fetched redirect body are skipped.
    pub fn aliases_for<'a, I>(&self, names: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = &'a DependencyName>,
    {
        let records = self.records.read();
        names
            .into_iter()
            .filter(|name| name.kind() == DependencyKind::Template)
            .filter_map(|name| {
                let body = records.get(name)?.body.as_deref()?;
                let target = redirect_target(body)?;
                Some((name.key().to_string(), target))
            })
            .collect()
    }

    /// Transient failure messages seen so far
    pub fn transient_failures(&self) -> Vec<String> {
        self.transient_failures.read().clone()
    }

    /// Number of fetches started by this store
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Remember that the closures of `names` are fully terminal
    pub fn mark_closed<'a, I>(&self, names: I)
    where
        I: IntoIterator<Item = &'a DependencyName>,
    {
        let mut closed = self.closed.write();
        closed.extend(names.into_iter().cloned());
    }

    /// Whether the closure of `name` is known to be fully terminal
    pub fn is_closed(&self, name: &DependencyName) -> bool {
        self.closed.read().contains(name)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store has no records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

async fn fetch_and_record(
    store: DependencyStore,
    name: DependencyName,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
) -> FetchOutcome {
    store.fetches.fetch_add(1, Ordering::SeqCst);
    let outcome = match tokio::time::timeout(timeout, fetcher.fetch(&name)).await {
        Ok(outcome) => outcome,
        Err(_) => FetchOutcome::TransientError(FetchError::Timeout(timeout).to_string()),
    };
    store.record_outcome(&name, &outcome);
    store.in_flight.lock().remove(&name);
    outcome
}

impl Default for DependencyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DependencyStore {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            in_flight: self.in_flight.clone(),
            closed: self.closed.clone(),
            transient_failures: self.transient_failures.clone(),
            fetches: self.fetches.clone(),
        }
    }
}

impl std::fmt::Debug for DependencyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyStore")
            .field("counts", &self.counts())
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}
