/*!
 * Per-definition processing: resolve, normalize, classify.
 *
 * A definition whose dependencies all reach a terminal status is rendered
 * straight away. One that still has pending dependencies becomes a
 * [`PendingWorkItem`]; the [`RetryScheduler`] re-resolves only its missing
 * names at a fixed interval until they settle or the retry ceiling is hit.
 */

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::dependencies::scan::scan_text;
use crate::dependencies::{DependencyName, DependencyResolver, DependencyStatus};
use crate::extractor::RawDefinition;
use crate::rewrite::Normalizer;

/// How a definition was finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionOutcome {
    /// Every dependency was available
    Rendered,
    /// A directly invoked dependency does not exist; rendered without it
    Degraded,
    /// Dependencies stayed unavailable through every retry; rendered with residue
    RetryExhausted,
    /// Still unresolved when the run stopped; not rendered
    Pending,
}

impl DefinitionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::Degraded => "degraded",
            Self::RetryExhausted => "retry_exhausted",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for DefinitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DefinitionOutcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rendered" => Ok(Self::Rendered),
            "degraded" => Ok(Self::Degraded),
            "retry_exhausted" => Ok(Self::RetryExhausted),
            "pending" => Ok(Self::Pending),
            other => Err(anyhow::anyhow!("Invalid definition outcome: {}", other)),
        }
    }
}

/// One finalized definition, as handed to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDefinition {
    pub entry: String,
    pub part_of_speech: String,
    pub sense_number: usize,
    pub sense_id: Option<String>,
    pub etymology: Option<u32>,
    pub raw_text: String,
    /// `None` only for definitions left pending
    pub normalized: Option<String>,
    pub outcome: DefinitionOutcome,
    /// Dependencies that were missing or pending when it was finalized
    pub unresolved: Vec<String>,
    /// Usage examples, as extracted
    pub examples: Vec<String>,
}

/// A definition waiting for pending dependencies
#[derive(Debug, Clone)]
pub struct PendingWorkItem {
    pub definition: RawDefinition,
    /// Names invoked directly by the definition
    pub required: BTreeSet<DependencyName>,
    /// Names still pending after the last pass
    pub missing: BTreeSet<DependencyName>,
    pub retries: u32,
}

/// Counters exposed for reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Definitions handed to the processor
    pub processed: usize,
    /// Rendered with every dependency available
    pub succeeded: usize,
    /// Rendered without a dependency that does not exist
    pub degraded: usize,
    /// Gave up at the retry ceiling
    pub permanently_failed: usize,
    /// Rendered after at least one retry
    pub retried_succeeded: usize,
    /// Left pending when the run stopped
    pub still_pending: usize,
    /// Definitions invoking each dependency
    pub usage: HashMap<String, usize>,
}

impl ProcessingStats {
    /// The `limit` most used dependencies, most used first
    pub fn most_used(&self, limit: usize) -> Vec<(String, usize)> {
        let mut usage: Vec<(String, usize)> =
            self.usage.iter().map(|(name, count)| (name.clone(), *count)).collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        usage.truncate(limit);
        usage
    }
}

/// Destination of finalized definitions
#[async_trait]
pub trait DefinitionSink: Send + Sync {
    /// Store a batch of definitions
    async fn save(&self, definitions: Vec<ProcessedDefinition>) -> Result<()>;
}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    definitions: Arc<Mutex<Vec<ProcessedDefinition>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions(&self) -> Vec<ProcessedDefinition> {
        self.definitions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.definitions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.lock().is_empty()
    }
}

#[async_trait]
impl DefinitionSink for MemorySink {
    async fn save(&self, definitions: Vec<ProcessedDefinition>) -> Result<()> {
        self.definitions.lock().extend(definitions);
        Ok(())
    }
}

/// Turns raw definitions into processed ones
#[derive(Debug, Clone)]
pub struct DefinitionProcessor {
    /// `None` renders without resolving anything
    resolver: Option<DependencyResolver>,
    normalizer: Normalizer,
    retry_ceiling: u32,
    pending: Arc<Mutex<Vec<PendingWorkItem>>>,
    stats: Arc<Mutex<ProcessingStats>>,
}

impl DefinitionProcessor {
    pub fn new(resolver: DependencyResolver, normalizer: Normalizer, retry_ceiling: u32) -> Self {
        Self {
            resolver: Some(resolver),
            normalizer,
            retry_ceiling: retry_ceiling.max(1),
            pending: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(ProcessingStats::default())),
        }
    }

    /// A processor that never resolves dependencies
    pub fn offline(normalizer: Normalizer) -> Self {
        Self {
            resolver: None,
            normalizer,
            retry_ceiling: 1,
            pending: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(ProcessingStats::default())),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.resolver.is_none()
    }

    /// Process one definition. `None` means it was queued for a retry.
    pub async fn process(&self, definition: RawDefinition) -> Option<ProcessedDefinition> {
        self.stats.lock().processed += 1;

        let Some(resolver) = &self.resolver else {
            self.record_usage(&scan_text(&definition.text));
            self.stats.lock().succeeded += 1;
            return Some(self.finish(definition, DefinitionOutcome::Rendered, &BTreeSet::new(), Vec::new()));
        };

        let result = resolver.resolve(&definition.text).await;
        self.record_usage(&result.required);

        if result.is_retryable() {
            debug!(
                "'{}' sense {} waits for {} dependencies",
                definition.entry,
                definition.sense_number,
                result.missing.len()
            );
            self.pending.lock().push(PendingWorkItem {
                definition,
                required: result.required,
                missing: result.missing,
                retries: 0,
            });
            return None;
        }

        Some(self.settle(definition, &result.required, false))
    }

    /// Process many definitions, at most `concurrency` at a time
    pub async fn process_batch(
        &self,
        definitions: Vec<RawDefinition>,
        concurrency: usize,
    ) -> Vec<ProcessedDefinition> {
        stream::iter(definitions)
            .map(|definition| self.process(definition))
            .buffer_unordered(concurrency.max(1))
            .filter_map(|processed| async move { processed })
            .collect()
            .await
    }

    /// Re-resolve the missing names of every pending item once.
    ///
    /// Returns the items that were finalized by this pass; the others stay
    /// queued with their retry counter increased.
    pub async fn retry_pending(&self) -> Vec<ProcessedDefinition> {
        let Some(resolver) = &self.resolver else {
            return Vec::new();
        };
        let items = std::mem::take(&mut *self.pending.lock());
        if items.is_empty() {
            return Vec::new();
        }

        let results = join_all(items.iter().map(|item| resolver.resolve_names(item.missing.clone()))).await;

        let mut finished = Vec::new();
        let mut waiting = Vec::new();
        for (mut item, result) in items.into_iter().zip(results) {
            item.retries += 1;
            if !result.is_retryable() {
                finished.push(self.settle(item.definition, &item.required, true));
            } else if item.retries >= self.retry_ceiling {
                warn!(
                    "Giving up on '{}' sense {} after {} retries",
                    item.definition.entry, item.definition.sense_number, item.retries
                );
                self.stats.lock().permanently_failed += 1;
                let unresolved = result.missing.iter().map(ToString::to_string).collect();
                finished.push(self.finish(
                    item.definition,
                    DefinitionOutcome::RetryExhausted,
                    &item.required,
                    unresolved,
                ));
            } else {
                item.missing = result.missing;
                waiting.push(item);
            }
        }

        if !finished.is_empty() {
            info!("Retry pass finalized {} definitions, {} still waiting", finished.len(), waiting.len());
        }
        self.pending.lock().extend(waiting);
        finished
    }

    /// Finalize everything still queued as `Pending`, without rendering
    pub fn drain_pending(&self) -> Vec<ProcessedDefinition> {
        let items = std::mem::take(&mut *self.pending.lock());
        self.stats.lock().still_pending += items.len();
        items
            .into_iter()
            .map(|item| {
                let unresolved = item.missing.iter().map(ToString::to_string).collect();
                self.finish(item.definition, DefinitionOutcome::Pending, &item.required, unresolved)
            })
            .collect()
    }

    /// Record definitions that were extracted but never processed as `Pending`
    pub fn set_aside(&self, definitions: Vec<RawDefinition>) -> Vec<ProcessedDefinition> {
        self.stats.lock().still_pending += definitions.len();
        definitions
            .into_iter()
            .map(|definition| self.finish(definition, DefinitionOutcome::Pending, &BTreeSet::new(), Vec::new()))
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn stats(&self) -> ProcessingStats {
        self.stats.lock().clone()
    }

    /// Finalize a definition whose dependencies are all terminal
    fn settle(
        &self,
        definition: RawDefinition,
        required: &BTreeSet<DependencyName>,
        retried: bool,
    ) -> ProcessedDefinition {
        let confirmed_missing: Vec<String> = match &self.resolver {
            Some(resolver) => required
                .iter()
                .filter(|name| resolver.store().status(name) == Some(DependencyStatus::ConfirmedMissing))
                .map(ToString::to_string)
                .collect(),
            None => Vec::new(),
        };

        if confirmed_missing.is_empty() {
            {
                let mut stats = self.stats.lock();
                stats.succeeded += 1;
                if retried {
                    stats.retried_succeeded += 1;
                }
            }
            self.finish(definition, DefinitionOutcome::Rendered, required, Vec::new())
        } else {
            self.stats.lock().degraded += 1;
            self.finish(definition, DefinitionOutcome::Degraded, required, confirmed_missing)
        }
    }

    fn finish(
        &self,
        definition: RawDefinition,
        outcome: DefinitionOutcome,
        required: &BTreeSet<DependencyName>,
        unresolved: Vec<String>,
    ) -> ProcessedDefinition {
        let normalized = match outcome {
            DefinitionOutcome::Pending => None,
            _ => Some(self.normalizer_for(required).normalize(&definition.text)),
        };

        ProcessedDefinition {
            entry: definition.entry,
            part_of_speech: definition.part_of_speech,
            sense_number: definition.sense_number,
            sense_id: definition.sense_id,
            etymology: definition.etymology,
            raw_text: definition.text,
            normalized,
            outcome,
            unresolved,
            examples: definition.examples,
        }
    }

    /// The normalizer, with redirects among `required` applied first
    fn normalizer_for(&self, required: &BTreeSet<DependencyName>) -> Normalizer {
        let aliases = match &self.resolver {
            Some(resolver) if !required.is_empty() => resolver.store().aliases_for(required),
            _ => HashMap::new(),
        };
        if aliases.is_empty() {
            self.normalizer.clone()
        } else {
            self.normalizer.clone().with_aliases(aliases)
        }
    }

    fn record_usage(&self, names: &BTreeSet<DependencyName>) {
        if names.is_empty() {
            return;
        }
        let mut stats = self.stats.lock();
        for name in names {
            *stats.usage.entry(name.to_string()).or_insert(0) += 1;
        }
    }
}

/// Drives retries of pending work at a fixed interval
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    processor: DefinitionProcessor,
    interval: Duration,
}

impl RetryScheduler {
    pub fn new(processor: DefinitionProcessor, interval: Duration) -> Self {
        Self { processor, interval }
    }

    /// Retry until nothing is pending or `shutdown` completes.
    ///
    /// A retry pass that has started runs to completion before shutdown is
    /// observed, so no fetch is abandoned halfway. Returns the number of
    /// definitions written to `sink`.
    pub async fn run<S, F>(&self, sink: &S, shutdown: F) -> Result<usize>
    where
        S: DefinitionSink + ?Sized,
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        tokio::pin!(shutdown);

        let mut written = 0;
        while self.processor.pending_count() > 0 {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Retry scheduler stopped with {} definitions pending", self.processor.pending_count());
                    break;
                }
                _ = ticker.tick() => {
                    let finished = self.processor.retry_pending().await;
                    written += finished.len();
                    if !finished.is_empty() {
                        sink.save(finished).await?;
                    }
                }
            }
        }
        Ok(written)
    }
}
