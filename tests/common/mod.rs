/*!
 * Common test utilities for the wikigloss test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use wikigloss::Config;
use wikigloss::RawDefinition;

/// Routes library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Escapes page text for embedding in a dump
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Builds a MediaWiki export from `(title, namespace, text)` triples
pub fn dump_xml(pages: &[(&str, i64, &str)]) -> String {
    let mut xml = String::from(
        "<mediawiki xmlns=\"http://www.mediawiki.org/xml/export-0.10/\">\n  <siteinfo><sitename>Wiktionary</sitename></siteinfo>\n",
    );
    for (title, namespace, text) in pages {
        xml.push_str(&format!(
            "  <page>\n    <title>{}</title>\n    <ns>{}</ns>\n    <revision><text>{}</text></revision>\n  </page>\n",
            escape_xml(title),
            namespace,
            escape_xml(text)
        ));
    }
    xml.push_str("</mediawiki>\n");
    xml
}

/// Writes a dump with the given main-namespace pages
pub fn create_test_dump(dir: &Path, filename: &str, pages: &[(&str, &str)]) -> Result<PathBuf> {
    let pages: Vec<(&str, i64, &str)> = pages.iter().map(|(title, text)| (*title, 0, *text)).collect();
    create_test_file(dir, filename, &dump_xml(&pages))
}

/// A default configuration whose database and reports live under `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.database_path = Some(dir.join("wikigloss.db"));
    config.storage.reports_dir = dir.join("reports");
    config.processing.concurrent_definitions = 4;
    config.processing.retry_interval_ms = 5;
    config.fetch.timeout_secs = 5;
    config
}

/// A noun definition of `word`
pub fn definition(text: &str) -> RawDefinition {
    RawDefinition {
        entry: "word".to_string(),
        part_of_speech: "Noun".to_string(),
        sense_number: 1,
        depth: 1,
        text: text.to_string(),
        sense_id: None,
        etymology: None,
        examples: Vec::new(),
    }
}

/// Page text with English noun definitions
pub fn english_page(definitions: &[&str]) -> String {
    let mut text = String::from("==English==\n===Noun===\n{{en-noun}}\n\n");
    for line in definitions {
        text.push_str("# ");
        text.push_str(line);
        text.push('\n');
    }
    text
}
