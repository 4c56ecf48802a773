/*!
 * Rule 12: whitespace, punctuation and capitalisation.
 *
 * Runs once, after the fixed-point loop, on the fully expanded text.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RuleError;
use crate::rewrite::RewriteRule;

/// Words that stay lower-case after a leading label group
const CONNECTORS: &[&str] = &[
    "alternative",
    "short",
    "plural",
    "singular",
    "obsolete",
    "abbreviation",
    "initialism",
    "acronym",
    "clipping",
    "contraction",
    "diminutive",
    "feminine",
    "masculine",
    "ellipsis",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r" ([.,;:!?])").unwrap());
static MISSING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([,;!?])([A-Za-z])").unwrap());
// Sentence breaks only; "e.g." and "U.S." keep their dots tight
static MISSING_SPACE_AFTER_STOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]{2}[.:])([A-Z])").unwrap());
static LABEL_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\([^)]*\) )(\w+)").unwrap());
// Matches what the list-marker pre-pass strips, so a second pass is a no-op
static LEADING_MARKERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[#*:]+\s*)+").unwrap());

/// Final tidy-up of a rendered definition
pub struct WhitespaceRule;

impl RewriteRule for WhitespaceRule {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        let text = WHITESPACE.replace_all(text, " ");
        let text = SPACE_BEFORE_PUNCTUATION.replace_all(&text, "$1");
        let text = MISSING_SPACE.replace_all(&text, "$1 $2");
        let text = MISSING_SPACE_AFTER_STOP.replace_all(&text, "$1 $2");
        let text = text.replace("( ", "(").replace(" )", ")");
        let text = LEADING_MARKERS.replace(text.trim(), "");
        let text = text.trim_end_matches(|c: char| matches!(c, ',' | ';' | ':') || c.is_whitespace());
        let text = capitalize(text);

        if text.is_empty() || text.ends_with(['.', '!', '?']) {
            Ok(text)
        } else {
            Ok(format!("{}.", text))
        }
    }
}

fn capitalize(text: &str) -> String {
    if let Some(caps) = LABEL_GROUP.captures(text) {
        let word = &caps[2];
        let lower = word.to_lowercase();
        if word != lower && CONNECTORS.contains(&lower.as_str()) {
            let rest = &text[caps[0].len()..];
            return format!("{}{}{}", &caps[1], lower, rest);
        }
        return text.to_string();
    }

    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => text.to_string(),
    }
}
