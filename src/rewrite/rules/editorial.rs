/*!
 * Rules 1 and 2: constructs with no lexical content are removed outright.
 */

use crate::errors::RuleError;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::rewrite_invocations;

const EDITORIAL: &[&str] = &[
    "senseid",
    "sid",
    "translation only",
    "&lit",
    "def-uncertain",
    "descendant only",
    "isbn",
    "attention",
    "attn",
    "tea room",
    "c",
    "top",
    "topics",
    "cln",
    "catlangname",
    "anchor",
];

const DATE_QUALIFIERS: &[&str] = &["defdate", "defdt", "datedef", "first attested"];

/// Removes requests for attention, sense ids, topic categories and the like
pub struct EditorialRule;

impl RewriteRule for EditorialRule {
    fn name(&self) -> &'static str {
        "editorial"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            let key = invocation.key.as_str();
            let is_request = key.starts_with("rf");
            Ok((is_request || EDITORIAL.contains(&key)).then(String::new))
        })
    }
}

/// Removes "first attested" date qualifiers
pub struct DateQualifierRule;

impl RewriteRule for DateQualifierRule {
    fn name(&self) -> &'static str {
        "date-qualifier"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            Ok(DATE_QUALIFIERS.contains(&invocation.key.as_str()).then(String::new))
        })
    }
}
