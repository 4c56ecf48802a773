/*!
 * Tests for retries of transient failures and for interrupted runs
 */

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::common;
use wikigloss::app_controller::{Controller, RunOptions, ShutdownSignal, ShutdownTrigger};
use wikigloss::database::Repository;
use wikigloss::processor::{MemorySink, RetryScheduler};
use wikigloss::{
    DefinitionOutcome, DefinitionProcessor, DependencyName, DependencyResolver, DependencyStore, FetchOutcome, Fetcher,
    MockFetcher, Normalizer,
};

/// Fetcher that stops the run as soon as it is asked for anything
#[derive(Debug)]
struct StoppingFetcher {
    inner: MockFetcher,
    trigger: ShutdownTrigger,
}

#[async_trait]
impl Fetcher for StoppingFetcher {
    async fn fetch(&self, name: &DependencyName) -> FetchOutcome {
        self.trigger.trigger();
        self.inner.fetch(name).await
    }
}

fn options(input: &std::path::Path) -> RunOptions {
    RunOptions {
        input: input.to_path_buf(),
        offline: false,
    }
}

/// Test that a definition whose template failed twice renders on a later pass
#[tokio::test]
async fn test_controller_run_withRecoveringFetcher_shouldRenderAfterRetry() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let page = common::english_page(&["{{q|rare}} a word"]);
    let dump = common::create_test_dump(temp_dir.path(), "dump.xml", &[("word", page.as_str())])?;
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_body("Template:q", "text")
            .failing_times("Template:q", 2),
    );

    let report = Controller::with_config(common::test_config(temp_dir.path()))?
        .with_fetcher(fetcher.clone())
        .run(options(&dump), ShutdownSignal::never())
        .await?;

    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.retried_succeeded, 1);
    assert_eq!(report.dependencies.transient_failures.len(), 2);
    assert_eq!(fetcher.total_calls(), 3);

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let rows = repository.definitions_for("word").await?;
    assert_eq!(rows[0].outcome, DefinitionOutcome::Rendered);
    assert_eq!(rows[0].normalized_text.as_deref(), Some("(rare) a word."));
    Ok(())
}

/// Test that the retry ceiling finalizes a definition with its residue
#[tokio::test]
async fn test_controller_run_withFailingFetcher_shouldExhaustRetries() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let page = common::english_page(&["{{foo|bar|baz}}"]);
    let dump = common::create_test_dump(temp_dir.path(), "dump.xml", &[("word", page.as_str())])?;
    let mut config = common::test_config(temp_dir.path());
    config.processing.retry_ceiling = 2;

    let report = Controller::with_config(config)?
        .with_fetcher(Arc::new(MockFetcher::always_failing()))
        .run(options(&dump), ShutdownSignal::never())
        .await?;

    assert_eq!(report.stats.permanently_failed, 1);
    assert_eq!(report.dependencies.counts.pending, 1);
    assert!(!report.dependencies.transient_failures.is_empty());

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let rows = repository.definitions_for("word").await?;
    assert_eq!(rows[0].outcome, DefinitionOutcome::RetryExhausted);
    assert_eq!(rows[0].normalized_text.as_deref(), Some("Baz."));
    assert_eq!(rows[0].unresolved, vec!["Template:foo".to_string()]);
    // Pending dependencies are never persisted
    assert!(repository.load_dependencies().await?.is_empty());
    Ok(())
}

/// Test an interruption while definitions wait for retries
#[tokio::test]
async fn test_controller_run_withShutdownDuringRetries_shouldKeepDefinitionsPending() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let page = common::english_page(&["{{foo|bar|baz}}", "A [[cat]]."]);
    let dump = common::create_test_dump(temp_dir.path(), "dump.xml", &[("word", page.as_str())])?;
    let mut config = common::test_config(temp_dir.path());
    config.processing.retry_ceiling = 1_000_000;

    let (trigger, shutdown) = ShutdownSignal::new();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.trigger();
    });

    let report = Controller::with_config(config)?
        .with_fetcher(Arc::new(MockFetcher::always_failing()))
        .run(options(&dump), shutdown)
        .await?;

    assert!(report.interrupted);
    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.still_pending, 1);

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let rows = repository.definitions_for("word").await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].outcome, DefinitionOutcome::Pending);
    assert_eq!(rows[0].normalized_text, None);
    assert_eq!(rows[1].outcome, DefinitionOutcome::Rendered);
    Ok(())
}

/// Test that definitions extracted but not yet processed at shutdown are stored as pending
#[tokio::test]
async fn test_controller_run_withShutdownBetweenBatches_shouldStoreUnprocessedAsPending() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let page = common::english_page(&[
        "{{q|rare}} a word",
        "Sense two.",
        "Sense three.",
        "Sense four.",
        "Sense five.",
        "Sense six.",
    ]);
    let dump = common::create_test_dump(temp_dir.path(), "dump.xml", &[("word", page.as_str())])?;
    let mut config = common::test_config(temp_dir.path());
    // Batches of four definitions
    config.processing.concurrent_definitions = 1;

    let (trigger, shutdown) = ShutdownSignal::new();
    let fetcher = StoppingFetcher {
        inner: MockFetcher::new().with_body("Template:q", "text"),
        trigger,
    };

    let report = Controller::with_config(config)?
        .with_fetcher(Arc::new(fetcher))
        .run(options(&dump), shutdown)
        .await?;

    assert!(report.interrupted);
    assert_eq!(report.definitions, 6);
    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(report.stats.still_pending, 2);

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let rows = repository.definitions_for("word").await?;
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].normalized_text.as_deref(), Some("(rare) a word."));
    assert_eq!(rows[3].outcome, DefinitionOutcome::Rendered);
    for row in &rows[4..] {
        assert_eq!(row.outcome, DefinitionOutcome::Pending);
        assert_eq!(row.normalized_text, None);
    }
    Ok(())
}

/// Test a run stopped before it starts reading
#[tokio::test]
async fn test_controller_run_withShutdownBeforeStart_shouldReportInterruption() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let page = common::english_page(&["A [[cat]]."]);
    let dump = common::create_test_dump(temp_dir.path(), "dump.xml", &[("word", page.as_str())])?;
    let (trigger, shutdown) = ShutdownSignal::new();
    trigger.trigger();

    let report = Controller::with_config(common::test_config(temp_dir.path()))?
        .with_fetcher(Arc::new(MockFetcher::new()))
        .run(options(&dump), shutdown)
        .await?;

    assert!(report.interrupted);
    assert_eq!(report.pages, 0);
    assert!(report.summary().contains("Interrupted"));
    Ok(())
}

/// Test that a deep transient failure holds back only the definitions that need it
#[tokio::test]
async fn test_retryScheduler_withDeepTransientFailure_shouldFinalizeAfterRecovery() -> Result<()> {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_body("Template:lb", "{{#invoke:labels|show}}")
            .with_body("Module:labels", "return {}")
            .failing_times("Module:labels", 1)
            .with_body("Template:q", "text"),
    );
    let resolver = DependencyResolver::new(DependencyStore::new(), fetcher, Duration::from_secs(5));
    let processor = DefinitionProcessor::new(resolver, Normalizer::new(), 3);

    let first = processor
        .process_batch(
            vec![
                common::definition("{{lb|en|transitive}} To carry."),
                common::definition("{{q|rare}} a word"),
            ],
            2,
        )
        .await;

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].normalized.as_deref(), Some("(rare) a word."));
    assert_eq!(processor.pending_count(), 1);

    let sink = MemorySink::new();
    let written = RetryScheduler::new(processor.clone(), Duration::from_millis(1))
        .run(&sink, std::future::pending::<()>())
        .await?;

    assert_eq!(written, 1);
    assert_eq!(sink.definitions()[0].normalized.as_deref(), Some("(transitive) To carry."));
    assert_eq!(processor.stats().retried_succeeded, 1);
    Ok(())
}
