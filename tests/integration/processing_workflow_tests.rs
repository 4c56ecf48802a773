/*!
 * End-to-end tests of a processing run: dump in, database rows and report out
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::common;
use wikigloss::app_controller::{Controller, RunOptions, ShutdownSignal};
use wikigloss::database::Repository;
use wikigloss::{Config, DefinitionOutcome, MockFetcher};

/// Fetcher that knows every template the sample dump uses except one
fn sample_fetcher() -> Arc<MockFetcher> {
    Arc::new(
        MockFetcher::new()
            .with_body("Template:lb", "{{#invoke:labels|show}}")
            .with_body("Module:labels", "local data = mw.loadData(\"Module:labels/data\")")
            .with_body("Module:labels/data", "return {}")
            .with_body("Template:foo", "<includeonly>second argument</includeonly>"),
    )
}

/// Writes a dump with two English entries under `dir`
fn sample_dump(dir: &Path) -> Result<std::path::PathBuf> {
    let cat = common::english_page(&[
        "{{lb|en|transitive}} To [[transport]] (someone).",
        "{{alternative spelling of|en|colour|t=hue}}",
        "A [[feline]].<ref>Webster</ref>",
    ]);
    let dog = common::english_page(&["{{foo|bar|baz}}"]);
    common::create_test_dump(dir, "dump.xml", &[("cat", cat.as_str()), ("dog", dog.as_str())])
}

async fn run(config: Config, fetcher: Arc<MockFetcher>, input: &Path, offline: bool) -> Result<wikigloss::reporter::RunReport> {
    Controller::with_config(config)?
        .with_fetcher(fetcher)
        .run(
            RunOptions {
                input: input.to_path_buf(),
                offline,
            },
            ShutdownSignal::never(),
        )
        .await
}

/// Test a complete run over a small dump
#[tokio::test]
async fn test_controller_run_withSampleDump_shouldPersistDefinitions() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dump = sample_dump(temp_dir.path())?;
    let fetcher = sample_fetcher();

    let report = run(common::test_config(temp_dir.path()), fetcher.clone(), &dump, false).await?;

    assert_eq!(report.pages, 2);
    assert_eq!(report.definitions, 4);
    assert_eq!(report.stats.processed, 4);
    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.degraded, 1);
    assert_eq!(report.stats.still_pending, 0);
    assert!(!report.interrupted);
    assert_eq!(report.dependencies.counts.fetched, 4);
    assert_eq!(
        report.dependencies.confirmed_missing,
        vec!["Template:alternative spelling of".to_string()]
    );
    assert_eq!(fetcher.total_calls(), 5);

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let cat = repository.definitions_for("cat").await?;
    assert_eq!(cat.len(), 3);
    assert_eq!(cat[0].outcome, DefinitionOutcome::Rendered);
    assert_eq!(cat[0].normalized_text.as_deref(), Some("(transitive) To transport (someone)."));
    assert_eq!(cat[1].outcome, DefinitionOutcome::Degraded);
    assert_eq!(cat[1].normalized_text.as_deref(), Some("Alternative spelling of colour (\"hue\")."));
    assert_eq!(cat[1].unresolved, vec!["Template:alternative spelling of".to_string()]);
    assert_eq!(cat[2].normalized_text.as_deref(), Some("A feline."));

    let dog = repository.definitions_for("dog").await?;
    assert_eq!(dog.len(), 1);
    assert_eq!(dog[0].normalized_text.as_deref(), Some("Baz."));
    assert_eq!(dog[0].raw_text, "# {{foo|bar|baz}}");
    Ok(())
}

/// Test that the run writes a JSON report and a text summary
#[tokio::test]
async fn test_controller_run_shouldWriteReportFiles() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dump = sample_dump(temp_dir.path())?;

    let report = run(common::test_config(temp_dir.path()), sample_fetcher(), &dump, false).await?;

    let reports_dir = temp_dir.path().join("reports");
    let mut names: Vec<String> = std::fs::read_dir(&reports_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with(".json"));
    assert!(names[1].ends_with(".txt"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(reports_dir.join(&names[0]))?)?;
    assert_eq!(json["run_id"], report.run_id.as_str());
    assert_eq!(json["stats"]["degraded"], 1);
    assert_eq!(json["dependencies"]["confirmed_missing"][0], "Template:alternative spelling of");

    let summary = std::fs::read_to_string(reports_dir.join(&names[1]))?;
    assert!(summary.contains("Confirmed missing (1):"));
    assert!(summary.contains("Template:lb"));
    Ok(())
}

/// Test that a second run reuses stored dependency bodies
#[tokio::test]
async fn test_controller_run_withStoredDependencies_shouldNotFetchAgain() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dump = sample_dump(temp_dir.path())?;
    run(common::test_config(temp_dir.path()), sample_fetcher(), &dump, false).await?;

    let offline_source = Arc::new(MockFetcher::always_failing());
    let report = run(common::test_config(temp_dir.path()), offline_source.clone(), &dump, false).await?;

    assert_eq!(offline_source.total_calls(), 0);
    assert_eq!(report.dependencies.fetches, 0);
    assert_eq!(report.stats.succeeded, 3);
    assert_eq!(report.stats.degraded, 1);

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    assert_eq!(repository.definitions_for("cat").await?.len(), 3);
    assert_eq!(repository.stats()?.definition_count, 4);
    Ok(())
}

/// Test an offline run renders everything without fetching
#[tokio::test]
async fn test_controller_run_offline_shouldRenderWithoutFetching() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dump = sample_dump(temp_dir.path())?;
    let fetcher = sample_fetcher();

    let report = run(common::test_config(temp_dir.path()), fetcher.clone(), &dump, true).await?;

    assert!(report.offline);
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(report.stats.succeeded, 4);
    assert_eq!(report.dependencies.counts.fetched, 0);
    assert!(report.dependencies.most_used.iter().any(|entry| entry.name == "Template:lb"));

    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let outcomes = repository.outcome_counts().await?;
    assert_eq!(outcomes, vec![(DefinitionOutcome::Rendered, 4)]);
    Ok(())
}

/// Test that the page limit stops reading early
#[tokio::test]
async fn test_controller_run_withLimit_shouldStopAfterLimit() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dump = sample_dump(temp_dir.path())?;
    let mut config = common::test_config(temp_dir.path());
    config.processing.limit = Some(1);

    let report = run(config, sample_fetcher(), &dump, false).await?;

    assert_eq!(report.pages, 1);
    assert_eq!(report.definitions, 3);
    assert!(!report.interrupted);
    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    assert!(repository.definitions_for("dog").await?.is_empty());
    Ok(())
}

/// Test a directory holding several dumps
#[tokio::test]
async fn test_controller_run_withDirectory_shouldReadEveryDump() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let dumps = temp_dir.path().join("dumps");
    std::fs::create_dir(&dumps)?;
    let first = common::english_page(&["A [[cat]]."]);
    let second = common::english_page(&["A [[dog]].", "{{q|rare}} a hound"]);
    common::create_test_dump(&dumps, "a.xml", &[("cat", first.as_str())])?;
    common::create_test_dump(&dumps, "b.xml", &[("dog", second.as_str())])?;
    common::create_test_file(&dumps, "notes.txt", "not a dump")?;

    let report = run(common::test_config(temp_dir.path()), sample_fetcher(), &dumps, true).await?;

    assert_eq!(report.pages, 2);
    assert_eq!(report.definitions, 3);
    let repository = Repository::open(temp_dir.path().join("wikigloss.db"))?;
    let dog = repository.definitions_for("dog").await?;
    assert_eq!(dog[1].normalized_text.as_deref(), Some("(rare) a hound."));
    Ok(())
}

/// Test that a missing input is reported before anything is written
#[tokio::test]
async fn test_controller_run_withMissingInput_shouldFail() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;

    let result = run(
        common::test_config(temp_dir.path()),
        sample_fetcher(),
        &temp_dir.path().join("missing.xml"),
        false,
    )
    .await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("reports").exists());
    Ok(())
}

/// Test the single-line normalize entry point of the controller
#[test]
fn test_controller_normalize_shouldMatchLibraryNormalize() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;

    assert_eq!(
        controller.normalize("# {{lb|en|transitive}} To [[transport]] (someone)."),
        wikigloss::normalize("# {{lb|en|transitive}} To [[transport]] (someone).")
    );
    Ok(())
}

/// Test that a directory without dumps is rejected
#[test]
fn test_controller_run_withEmptyDirectory_shouldFail() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let empty = temp_dir.path().join("empty");
    std::fs::create_dir(&empty)?;
    common::create_test_file(&empty, "readme.txt", "nothing here")?;

    let result = tokio_test::block_on(async {
        run(common::test_config(temp_dir.path()), sample_fetcher(), &empty, true).await
    });

    let error = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(error.contains("No .xml dump files found"), "unexpected error: {}", error);
    Ok(())
}
