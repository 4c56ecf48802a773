/*!
 * Rule 10: emphasis markers, inline tags and character entities.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RuleError;
use crate::markup::{decode_entities, strip_references};
use crate::rewrite::RewriteRule;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"'''(.+?)'''").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"''(.+?)''").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap());

/// Strips inline formatting
pub struct FormattingRule;

impl RewriteRule for FormattingRule {
    fn name(&self) -> &'static str {
        "formatting"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        let text = BOLD.replace_all(text, "$1");
        let text = ITALIC.replace_all(&text, "$1");
        let text = strip_references(&text);
        let text = TAG.replace_all(&text, "");
        Ok(decode_entities(&text))
    }
}
