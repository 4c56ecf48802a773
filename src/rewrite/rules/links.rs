/*!
 * Rule 9: link constructs, wikilinks and external links.
 */

use crate::errors::RuleError;
use crate::markup::{collapse_external_links, collapse_wikilinks};
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::rewrite_invocations;

/// `{{l|<lang>|<term>|<alt>}}` style constructs
const TERM_LINKS: &[&str] = &[
    "l", "ll", "link", "l-self", "l-lite", "m", "mention", "m-self", "m-lite",
];

/// `{{w|<article>|<display>}}` style constructs
const WIKIPEDIA_LINKS: &[&str] = &["w", "wtorw", "wikipedia-link", "wp"];

/// Collapses links to the text they display
pub struct LinkRule;

impl RewriteRule for LinkRule {
    fn name(&self) -> &'static str {
        "links"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        let expanded = rewrite_invocations(text, |invocation| {
            let key = invocation.key.as_str();
            let rendered = if TERM_LINKS.contains(&key) {
                invocation
                    .positional_at(1)
                    .or_else(|| invocation.positional_at(2))
            } else if WIKIPEDIA_LINKS.contains(&key) {
                invocation
                    .positional_at(1)
                    .or_else(|| invocation.positional_at(0))
            } else {
                return Ok(None);
            };
            Ok(Some(rendered.unwrap_or_default().to_string()))
        })?;

        Ok(collapse_external_links(&collapse_wikilinks(&expanded)))
    }
}
