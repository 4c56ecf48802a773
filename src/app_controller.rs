/*!
 * Application controller.
 *
 * Wires the pieces of a processing run together: dump files are streamed
 * page by page, definitions are extracted and processed in bounded batches,
 * finished definitions go to the SQLite sink, pending ones are retried until
 * they settle or the run is stopped, and a report is written at the end.
 */

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use walkdir::WalkDir;

use crate::app_config::Config;
use crate::database::Repository;
use crate::dependencies::{DependencyResolver, DependencyStore};
use crate::extractor::{DefinitionExtractor, RawDefinition};
use crate::fetchers::{Fetcher, WiktionaryFetcher};
use crate::processor::{DefinitionProcessor, DefinitionSink, RetryScheduler};
use crate::reporter::RunReport;
use crate::rewrite::Normalizer;
use crate::source::DumpReader;

/// Definitions buffered per concurrent slot before a batch is processed
const BATCH_FACTOR: usize = 4;

/// Sending half of a shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownTrigger(Arc<watch::Sender<bool>>);

impl ShutdownTrigger {
    /// Ask the run to stop
    pub fn trigger(&self) {
        let _ = self.0.send(true);
    }
}

/// Receiving half of a shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    pub fn new() -> (ShutdownTrigger, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger(Arc::new(tx)), ShutdownSignal(rx))
    }

    /// A signal that never fires
    pub fn never() -> ShutdownSignal {
        Self::new().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    /// Completes once the signal fires; never completes if it cannot fire anymore
    pub async fn wait(mut self) {
        if self.0.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Options of one processing run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Dump file, or a directory searched for `.xml` dumps
    pub input: PathBuf,
    /// Render without resolving dependencies
    pub offline: bool,
}

/// Main application controller
pub struct Controller {
    config: Config,
    /// Fetch collaborator; built from the configuration when absent
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl Controller {
    /// Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher: None,
        })
    }

    /// Use `fetcher` instead of the MediaWiki API
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The normalizer configured for this controller
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new().with_max_iterations(self.config.processing.max_iterations)
    }

    /// Normalise one markup line without resolving anything
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer().normalize(text)
    }

    /// Dump files under `input`, sorted; `input` itself when it is a file
    pub fn find_dump_files(input: &Path) -> Result<Vec<PathBuf>> {
        if !input.exists() {
            return Err(anyhow!("Input does not exist: {:?}", input));
        }
        if input.is_file() {
            return Ok(vec![input.to_path_buf()]);
        }

        let mut files: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(anyhow!("No .xml dump files found in directory: {:?}", input));
        }
        Ok(files)
    }

    /// Process every page of the input and write the run report
    pub async fn run(&self, options: RunOptions, shutdown: ShutdownSignal) -> Result<RunReport> {
        let files = Self::find_dump_files(&options.input)?;
        let processing = &self.config.processing;
        let mut report = RunReport::new(&options.input.to_string_lossy(), options.offline);

        let database_path = self.config.storage.resolved_database_path()?;
        let repository = Repository::open(&database_path)
            .with_context(|| format!("Failed to open database: {:?}", database_path))?;

        let (processor, store) = if options.offline {
            info!("Offline run: dependencies are not resolved");
            (DefinitionProcessor::offline(self.normalizer()), None)
        } else {
            let store = DependencyStore::new();
            let seeded = store.seed(repository.load_dependencies().await?);
            if seeded > 0 {
                info!("Loaded {} dependency records from earlier runs", seeded);
            }
            let resolver = DependencyResolver::new(
                store.clone(),
                self.fetcher()?,
                self.config.fetch.fetch_budget(),
            )
            .with_max_depth(processing.max_dependency_depth);
            let processor =
                DefinitionProcessor::new(resolver, self.normalizer(), processing.retry_ceiling);
            (processor, Some(store))
        };

        let extractor = DefinitionExtractor::new(&self.config.language)?;
        let concurrency = processing.concurrent_definitions;
        let batch_size = concurrency * BATCH_FACTOR;
        let progress_bar = progress_bar(processing.limit);

        let mut batch: Vec<RawDefinition> = Vec::with_capacity(batch_size);
        let mut pages = 0usize;
        let mut definitions = 0usize;

        'files: for file in &files {
            info!("Reading {}", file.display());
            let reader = DumpReader::open(file)?;

            for page in reader {
                if shutdown.is_triggered() {
                    break 'files;
                }
                if processing.limit.is_some_and(|limit| pages >= limit) {
                    break 'files;
                }

                let page = match page {
                    Ok(page) => page,
                    Err(e) => {
                        error!("Stopped reading {}: {:#}", file.display(), e);
                        break;
                    }
                };
                pages += 1;
                progress_bar.inc(1);

                let extracted = extractor.extract_page(&page);
                debug!("'{}': {} definitions", page.title, extracted.len());
                definitions += extracted.len();
                batch.extend(extracted);

                while batch.len() >= batch_size && !shutdown.is_triggered() {
                    let ready: Vec<RawDefinition> = batch.drain(..batch_size).collect();
                    repository.save(processor.process_batch(ready, concurrency).await).await?;
                    progress_bar.set_message(format!("{} definitions, {} waiting", definitions, processor.pending_count()));
                }
            }
        }

        if !batch.is_empty() {
            if shutdown.is_triggered() {
                warn!("{} extracted definitions were not processed before shutdown", batch.len());
                repository.save(processor.set_aside(batch)).await?;
            } else {
                repository.save(processor.process_batch(batch, concurrency).await).await?;
            }
        }
        progress_bar.finish_and_clear();
        info!("Read {} pages with {} definitions", pages, definitions);

        if processor.pending_count() > 0 && !shutdown.is_triggered() {
            info!("Retrying {} definitions with pending dependencies", processor.pending_count());
            let scheduler = RetryScheduler::new(
                processor.clone(),
                Duration::from_millis(processing.retry_interval_ms),
            );
            scheduler.run(&repository, shutdown.clone().wait()).await?;
        }

        let left = processor.drain_pending();
        if !left.is_empty() {
            warn!("{} definitions left pending", left.len());
            repository.save(left).await?;
        }

        if let Some(store) = &store {
            let saved = repository.save_dependencies(store.terminal_records()).await?;
            debug!("Persisted {} dependency records", saved);
        }

        let interrupted = shutdown.is_triggered();
        if interrupted {
            warn!("Run interrupted");
        }
        report.pages = pages;
        report.definitions = definitions;
        report.finish(processor.stats(), store.as_ref(), interrupted);

        let (json_path, _) = report.write(&self.config.storage.reports_dir)?;
        info!(
            "Done in {}: {} rendered, {} degraded, {} failed, {} pending. Report: {}",
            format_duration(report.duration_secs()),
            report.stats.succeeded,
            report.stats.degraded,
            report.stats.permanently_failed,
            report.stats.still_pending,
            json_path.display()
        );

        Ok(report)
    }

    fn fetcher(&self) -> Result<Arc<dyn Fetcher>> {
        match &self.fetcher {
            Some(fetcher) => Ok(fetcher.clone()),
            None => Ok(Arc::new(WiktionaryFetcher::from_config(&self.config.fetch)?)),
        }
    }
}

fn progress_bar(limit: Option<usize>) -> ProgressBar {
    let (progress_bar, template) = match limit {
        Some(limit) => (
            ProgressBar::new(limit as u64),
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({percent}%) {msg}",
        ),
        None => (
            ProgressBar::new_spinner(),
            "{spinner:.green} [{elapsed_precise}] {pos} pages {msg}",
        ),
    };
    let style = ProgressStyle::default_bar()
        .template(template)
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] {pos} {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar.enable_steady_tick(Duration::from_millis(120));
    progress_bar
}

// Format duration in a human-readable format
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.3}s", seconds)
    }
}
