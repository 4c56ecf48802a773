/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::fs;
use std::time::Duration;

use crate::common;
use wikigloss::Config;
use wikigloss::app_config::LogLevel;

/// Test the default configuration
#[test]
fn test_default_config_shouldBeValid() -> Result<()> {
    let config = Config::default();

    assert_eq!(config.language.name, "English");
    assert_eq!(config.language.code, "en");
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.processing.retry_ceiling >= 1);
    assert_eq!(config.processing.limit, None);
    config.validate()?;
    Ok(())
}

/// Test that a missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("wikigloss.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(written["language"]["code"], "en");
    assert_eq!(written["fetch"]["api_url"], config.fetch.api_url.as_str());
    Ok(())
}

/// Test that a partial config file keeps defaults for the rest
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "partial.json",
        r#"{
            "language": { "name": "French", "code": "fr" },
            "processing": { "retry_ceiling": 2, "limit": 10 },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.language.name, "French");
    assert_eq!(config.processing.retry_ceiling, 2);
    assert_eq!(config.processing.limit, Some(10));
    assert_eq!(config.processing.concurrent_definitions, Config::default().processing.concurrent_definitions);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    Ok(())
}

/// Test that a malformed config file is reported
#[test]
fn test_load_or_create_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

/// Test the validation rules
#[test]
fn test_validate_withInvalidSettings_shouldFail() {
    let mut config = Config::default();
    config.fetch.api_url = "not a url".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.fetch.timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.processing.concurrent_definitions = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.processing.max_iterations = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.language.name = "  ".to_string();
    assert!(config.validate().is_err());
}

/// Test that the fetch budget leaves room for every retry and its backoff
#[test]
fn test_fetch_budget_shouldCoverRetriesAndBackoff() {
    let mut config = Config::default();
    config.fetch.timeout_secs = 10;
    config.fetch.max_retries = 3;
    config.fetch.retry_backoff_ms = 1000;

    // 4 attempts of 10s, then 1s + 2s + 4s of backoff
    assert_eq!(config.fetch.fetch_budget(), Duration::from_secs(47));

    config.fetch.max_retries = 0;
    assert_eq!(config.fetch.fetch_budget(), Duration::from_secs(10));
}

/// Test that an explicit database path wins over the default location
#[test]
fn test_resolved_database_path_shouldPreferConfiguredPath() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path());

    assert_eq!(config.storage.resolved_database_path()?, temp_dir.path().join("wikigloss.db"));
    Ok(())
}
