/*!
 * Tests for the rewrite pipeline as seen through the public API
 */

use std::collections::HashMap;

use wikigloss::{Normalizer, normalize};

/// Test a labelled definition with a wikilink
#[test]
fn test_normalize_withLabelAndWikilink_shouldRenderQualifiedSentence() {
    assert_eq!(
        normalize("# {{lb|en|transitive}} To [[transport]] (someone)."),
        "(transitive) To transport (someone)."
    );
}

/// Test a form-of construct with a gloss parameter
#[test]
fn test_normalize_withFormOfGloss_shouldQuoteGloss() {
    assert_eq!(
        normalize("# {{alternative spelling of|en|colour|t=hue}}"),
        "Alternative spelling of colour (\"hue\")."
    );
}

/// Test the letter sentence produced by Latn-def
#[test]
fn test_normalize_withLetterDefinition_shouldRenderLetterSentence() {
    assert_eq!(
        normalize("# {{Latn-def|en|letter|1|A}}"),
        "The first letter of the English alphabet, called A and written in the Latin script."
    );
}

/// Test that unknown constructs keep their second positional argument
#[test]
fn test_normalize_withUnknownConstruct_shouldKeepSecondPositional() {
    assert_eq!(normalize("{{foo|bar|baz}}"), "Baz.");
    assert_eq!(normalize("{{foo|bar}} A cat."), "A cat.");
}

/// Test nested link constructs resolve from the inside out
#[test]
fn test_normalize_withNestedLinks_shouldResolveInnermostFirst() {
    assert_eq!(normalize("{{m|en|{{l|en|cat}}}}"), "Cat.");
}

/// Test references and entities in the same line
#[test]
fn test_normalize_withReferencesAndEntities_shouldStripAndDecode() {
    assert_eq!(normalize("# A [[feline]].<ref>Webster</ref>"), "A feline.");
    assert_eq!(normalize("fish &amp; chips"), "Fish & chips.");
}

/// Test that a second pass over normalized output changes nothing
#[test]
fn test_normalize_appliedTwice_shouldBeStable() {
    let samples = [
        "# {{lb|en|transitive}} To [[transport]] (someone).",
        "# {{alternative spelling of|en|colour|t=hue}}",
        "# {{Latn-def|en|letter|1|A}}",
        "{{foo|bar|baz}}",
        "{{m|en|{{l|en|cat}}}}",
        "{{q|rare}} a word",
        "{{lb|en|obsolete}} {{alternative spelling of|en|colour}}",
        "# A [[feline]] &amp; ''pet''.<ref>x</ref>",
        "''plural of'' {{l|en|cat}}",
        "&#35;1 hit single",
        "{{foo|bar|* star}}",
        "{{n-g|: see below}}",
        "[[w:Paris|Paris]], [[Category:Foo]]",
        "",
    ];

    for sample in samples {
        let once = normalize(sample);
        assert_eq!(normalize(&once), once, "unstable output for {:?}", sample);
    }
}

/// Test that no braces survive pathological nesting
#[test]
fn test_normalize_withDeepNesting_shouldTerminateWithoutBraces() {
    let nested = format!("{}x{}", "{{foo|".repeat(200), "}}".repeat(200));

    let output = normalize(&nested);

    assert!(!output.contains("{{"), "braces left in {:?}", output);
    assert!(!output.contains("}}"), "braces left in {:?}", output);
}

/// Test that nesting far beyond the scanner depth is deleted as a whole
#[test]
fn test_normalize_withVeryDeepNesting_shouldDropTheWholeConstruct() {
    let nested = format!("keep {}x{}", "{{a|".repeat(5000), "}}".repeat(5000));

    assert_eq!(normalize(&nested), "Keep.");
}

/// Test that separators left by removed constructs do not precede the period
#[test]
fn test_normalize_withTrailingSeparator_shouldEndWithPeriod() {
    assert_eq!(normalize("[[w:Paris|Paris]], [[Category:Foo]]"), "Paris.");
    assert_eq!(normalize("word ,"), "Word.");
}

/// Test that list markers produced by rewriting are not left at the start
#[test]
fn test_normalize_withRenderedListMarker_shouldStripIt() {
    assert_eq!(normalize("&#35;1 hit single"), "1 hit single.");
    assert_eq!(normalize("{{foo|bar|* star}}"), "Star.");
}

/// Test that unbalanced markup still terminates
#[test]
fn test_normalize_withUnbalancedBraces_shouldTerminate() {
    for text in ["{{{{{{ a", "a }} b }} c", "{{lb|en|{{q|x}}", "{{{1|default}}} word"] {
        let output = normalize(text);
        assert!(!output.contains("{{") && !output.contains("}}"), "braces left in {:?}", output);
    }
}

/// Test that redirect aliases route a construct to a specific rule
#[test]
fn test_normalizer_withAliases_shouldRenameBeforeRendering() {
    let aliases = HashMap::from([(
        "sp variant".to_string(),
        "alternative spelling of".to_string(),
    )]);
    let normalizer = Normalizer::new().with_aliases(aliases);

    assert_eq!(normalizer.rule_names()[0], "alias");
    assert_eq!(normalizer.normalize("{{sp variant|en|color}}"), "Alternative spelling of color.");
    assert_eq!(normalize("{{sp variant|en|color}}"), "Color.");
}

/// Test that the iteration ceiling never goes below one pass
#[test]
fn test_normalizer_withZeroIterations_shouldStillRender() {
    let normalizer = Normalizer::new().with_max_iterations(0);
    assert_eq!(normalizer.normalize("{{q|rare}} a word"), "(rare) a word.");
}
