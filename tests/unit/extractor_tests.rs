/*!
 * Tests for dump reading and definition extraction
 */

use anyhow::Result;

use crate::common;
use wikigloss::DefinitionExtractor;
use wikigloss::source::{DumpReader, Page};

/// Test reading a dump file and extracting its English definitions
#[test]
fn test_extractPage_withDumpFile_shouldYieldLanguageDefinitions() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cat = "==English==\n===Noun===\n{{en-noun}}\n\n# A [[feline]] & pet.\n#: {{ux|en|The cat sat.}}\n\n==French==\n===Noun===\n# chat";
    let run = common::english_page(&["To move quickly.", "{{lb|en|transitive}} To manage."]);
    let dump = common::dump_xml(&[
        ("cat", 0, cat),
        ("Template:lb", 10, "{{#invoke:labels|show}}"),
        ("run", 0, run.as_str()),
    ]);
    let path = common::create_test_file(temp_dir.path(), "dump.xml", &dump)?;

    let extractor = DefinitionExtractor::for_language("English", "en")?;
    let pages: Vec<Page> = DumpReader::open(&path)?.collect::<Result<_>>()?;
    let definitions: Vec<_> = pages.iter().flat_map(|page| extractor.extract_page(page)).collect();

    assert_eq!(pages.len(), 2);
    assert_eq!(definitions.len(), 3);
    assert_eq!(definitions[0].entry, "cat");
    assert_eq!(definitions[0].text, "# A [[feline]] & pet.");
    assert_eq!(definitions[0].examples, vec!["The cat sat.".to_string()]);
    assert_eq!(definitions[1].entry, "run");
    assert_eq!(definitions[1].sense_number, 1);
    assert_eq!(definitions[2].sense_number, 2);
    assert_eq!(definitions[2].text, "# {{lb|en|transitive}} To manage.");
    assert!(definitions.iter().all(|d| d.part_of_speech == "Noun"));
    Ok(())
}

/// Test that another configured language selects its own section
#[test]
fn test_extract_withFrenchExtractor_shouldSkipEnglish() -> Result<()> {
    let text = "==English==\n===Noun===\n# A cat.\n==French==\n===Nom===\n# ignored\n===Noun===\n# chat";
    let extractor = DefinitionExtractor::for_language("French", "fr")?;

    let definitions = extractor.extract("chat", text);

    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].text, "# chat");
    Ok(())
}

/// Test subsenses and non-definition lines of a block
#[test]
fn test_extract_withSubsensesAndQuotations_shouldKeepDefinitionLinesOnly() -> Result<()> {
    let text = "==English==\n===Verb===\n# To run.\n#* 1900, a quotation\n## To flee.\n#: usage example\n# Kinds:\n\n====Translations====\n# not a definition";
    let extractor = DefinitionExtractor::for_language("English", "en")?;

    let definitions = extractor.extract("run", text);
    let depths: Vec<usize> = definitions.iter().map(|d| d.depth).collect();

    assert_eq!(depths, vec![1, 2]);
    assert!(definitions.iter().all(|d| d.part_of_speech == "Verb"));
    assert!(definitions[0].examples.is_empty());
    assert_eq!(definitions[1].examples, vec!["usage example".to_string()]);
    Ok(())
}

/// Test sense ids, etymology numbers and usage examples
#[test]
fn test_extract_withEtymologySections_shouldRecordSenseMetadata() -> Result<()> {
    let text = "==English==
===Etymology 1===
====Noun====
# {{senseid|en|Q146}} A [[feline]].
#: {{ux|en|The '''cat''' sat.}}
#: Another example.
===Etymology 2===
====Verb====
# To hoist (an anchor).
==French==
===Etymology 3===
====Noun====
# chat";
    let extractor = DefinitionExtractor::for_language("English", "en")?;

    let definitions = extractor.extract("cat", text);

    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0].etymology, Some(1));
    assert_eq!(definitions[0].sense_id.as_deref(), Some("Q146"));
    assert_eq!(
        definitions[0].examples,
        vec!["The '''cat''' sat.".to_string(), "Another example.".to_string()]
    );
    assert_eq!(definitions[1].part_of_speech, "Verb");
    assert_eq!(definitions[1].etymology, Some(2));
    assert_eq!(definitions[1].sense_id, None);
    assert!(definitions[1].examples.is_empty());
    Ok(())
}

/// Test a truncated dump yields the complete pages and then one error
#[test]
fn test_dumpReader_withTruncatedDump_shouldStopWithError() -> Result<()> {
    let mut dump = common::dump_xml(&[("cat", 0, "==English==\n===Noun===\n# A cat.")]);
    dump = dump.replace("</mediawiki>\n", "<page><title>dog</title></revision>");

    let results: Vec<Result<Page>> = DumpReader::new(dump.as_bytes()).collect();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().map(|p| p.title.as_str()).ok(), Some("cat"));
    assert!(results[1].is_err());
    Ok(())
}
