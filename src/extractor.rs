/*!
 * Definition extraction from page markup.
 *
 * Slices one page into the definition lines of the configured language,
 * grouped by part of speech. Usage examples (`#:` lines) are attached to the
 * definition above them instead of being emitted as definitions, and each
 * definition records its `{{senseid}}` and its etymology section number.
 * No markup is expanded here.
 */

use std::collections::HashSet;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::app_config::LanguageConfig;
use crate::markup::{Invocation, scan_invocations};
use crate::source::Page;

/// Section titles that open a definition block
pub const PARTS_OF_SPEECH: &[&str] = &[
    "Noun",
    "Proper noun",
    "Verb",
    "Adjective",
    "Adverb",
    "Pronoun",
    "Preposition",
    "Postposition",
    "Conjunction",
    "Interjection",
    "Determiner",
    "Article",
    "Numeral",
    "Number",
    "Particle",
    "Participle",
    "Classifier",
    "Counter",
    "Prefix",
    "Suffix",
    "Infix",
    "Interfix",
    "Circumfix",
    "Affix",
    "Letter",
    "Symbol",
    "Punctuation mark",
    "Diacritical mark",
    "Syllable",
    "Phrase",
    "Prepositional phrase",
    "Proverb",
    "Idiom",
    "Contraction",
    "Abbreviation",
    "Initialism",
    "Acronym",
    "Ideophone",
];

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(={2,6})\s*(.+?)\s*(={2,6})\s*$").unwrap());
static ETYMOLOGY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^etymology(?:\s+(\d+))?$").unwrap());

const EXAMPLE_TEMPLATES: &[&str] = &["ux", "uxi", "usex"];

/// One definition line of an entry, as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDefinition {
    /// Page title
    pub entry: String,
    pub part_of_speech: String,
    /// 1-based position among the definitions of the page
    pub sense_number: usize,
    /// 1 for `#`, 2 for `##`
    pub depth: usize,
    /// The raw markup line
    pub text: String,
    /// Id given by a `{{senseid|lang|id}}` on the line
    #[serde(default)]
    pub sense_id: Option<String>,
    /// Number of the enclosing etymology section; 1 when it is unnumbered
    #[serde(default)]
    pub etymology: Option<u32>,
    /// Usage examples from the `#:` lines below the definition
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Extracts definition lines for one language
#[derive(Debug, Clone)]
pub struct DefinitionExtractor {
    language_name: String,
    parts_of_speech: HashSet<String>,
    headword: Regex,
}

impl DefinitionExtractor {
    pub fn new(language: &LanguageConfig) -> Result<Self> {
        Self::for_language(&language.name, &language.code)
    }

    pub fn for_language(name: &str, code: &str) -> Result<Self> {
        let code = regex::escape(code.trim());
        let headword = Regex::new(&format!(
            r"^\{{\{{(?:{code}-([a-z][a-z ]*)|head\|{code}\|([a-z][a-z ]*))\s*[|}}]",
            code = code
        ))
        .with_context(|| format!("Invalid headword pattern for language code '{}'", code))?;

        Ok(Self {
            language_name: name.trim().to_lowercase(),
            parts_of_speech: PARTS_OF_SPEECH.iter().map(|pos| pos.to_lowercase()).collect(),
            headword,
        })
    }

    pub fn extract_page(&self, page: &Page) -> Vec<RawDefinition> {
        self.extract(&page.title, &page.text)
    }

    /// Definition lines of `text`, in page order
    pub fn extract(&self, entry: &str, text: &str) -> Vec<RawDefinition> {
        let has_sections = text
            .lines()
            .filter_map(header)
            .any(|(level, _)| level == 2);

        let mut definitions: Vec<RawDefinition> = Vec::new();
        let mut in_language = !has_sections;
        let mut block: Option<String> = None;
        let mut etymology: Option<u32> = None;
        // Index of the last definition of the current block, for examples
        let mut last: Option<usize> = None;

        for line in text.lines() {
            if let Some((level, title)) = header(line) {
                last = None;
                if level == 2 {
                    in_language = title.to_lowercase() == self.language_name;
                    block = None;
                    etymology = None;
                } else if in_language && has_sections {
                    match etymology_number(title) {
                        Some(number) => {
                            etymology = Some(number);
                            block = None;
                        }
                        None => block = self.part_of_speech(title),
                    }
                } else {
                    block = None;
                }
                continue;
            }
            if !in_language {
                continue;
            }

            if !has_sections {
                if let Some(pos) = self.headword_part_of_speech(line) {
                    block = Some(pos);
                    last = None;
                    continue;
                }
            }

            let Some(part_of_speech) = block.as_ref() else {
                continue;
            };
            if let Some(depth) = definition_depth(line) {
                last = Some(definitions.len());
                definitions.push(RawDefinition {
                    entry: entry.to_string(),
                    part_of_speech: part_of_speech.clone(),
                    sense_number: definitions.len() + 1,
                    depth,
                    text: line.trim_end().to_string(),
                    sense_id: sense_id(line),
                    etymology,
                    examples: Vec::new(),
                });
            } else if let (Some(example), Some(index)) = (example_text(line), last) {
                definitions[index].examples.push(example);
            }
        }

        definitions
    }

    fn part_of_speech(&self, title: &str) -> Option<String> {
        self.parts_of_speech
            .contains(&title.to_lowercase())
            .then(|| title.to_string())
    }

    fn headword_part_of_speech(&self, line: &str) -> Option<String> {
        let caps = self.headword.captures(line.trim_start())?;
        let pos = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
        let mut chars = pos.chars();
        let first = chars.next()?;
        Some(first.to_uppercase().chain(chars).collect())
    }
}

/// Level and title of a `== Title ==` line
fn header(line: &str) -> Option<(usize, &str)> {
    let caps = HEADER.captures(line.trim_end())?;
    let (open, close) = (caps.get(1)?.as_str().len(), caps.get(3)?.as_str().len());
    let title = caps.get(2)?.as_str();
    Some((open.min(close), title))
}

/// `# text` -> 1, `## text` -> 2; examples, quotations and category lines -> None
fn definition_depth(line: &str) -> Option<usize> {
    let markers = line.chars().take_while(|c| *c == '#').count();
    if !(1..=2).contains(&markers) {
        return None;
    }
    let rest = &line[markers..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim();
    if content.is_empty() || content.ends_with(':') {
        return None;
    }
    Some(markers)
}

/// `Etymology 2` -> 2, `Etymology` -> 1
fn etymology_number(title: &str) -> Option<u32> {
    let caps = ETYMOLOGY.captures(title)?;
    match caps.get(1) {
        Some(number) => number.as_str().parse().ok(),
        None => Some(1),
    }
}

/// Top-level invocations of `line`, parsed
fn invocations(line: &str) -> Vec<Invocation> {
    scan_invocations(line)
        .unwrap_or_default()
        .iter()
        .filter(|span| span.depth == 0)
        .map(|span| Invocation::parse(span.inner(line)))
        .collect()
}

fn sense_id(line: &str) -> Option<String> {
    if !line.contains("senseid") {
        return None;
    }
    invocations(line)
        .iter()
        .find(|invocation| invocation.key == "senseid")
        .and_then(|invocation| invocation.positional_at(1))
        .map(|id| id.trim().to_string())
}

/// The example sentence of a `#:` or `##:` line
fn example_text(line: &str) -> Option<String> {
    let markers = line.chars().take_while(|c| *c == '#').count();
    if !(1..=2).contains(&markers) {
        return None;
    }
    let content = line[markers..].strip_prefix(':')?.trim();
    if content.is_empty() || content.starts_with(['*', ':']) {
        return None;
    }

    let sentence = invocations(content)
        .iter()
        .find(|invocation| EXAMPLE_TEMPLATES.contains(&invocation.key.as_str()))
        .and_then(|invocation| invocation.positional_at(1).map(|text| text.trim().to_string()));
    Some(sentence.unwrap_or_else(|| content.to_string()))
}
