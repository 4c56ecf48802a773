/*!
 * The rewrite rules, one module per construct family.
 *
 * Order matters: labels and qualifiers must be consumed before generic
 * cleanup sees their brackets, and links and formatting run after every
 * rule that can produce them.
 */

use std::sync::Arc;

use crate::errors::RuleError;
use crate::language_utils::looks_like_language_code;
use crate::markup::{Invocation, map_invocations};
use crate::rewrite::RewriteRule;

pub mod alias;
pub mod editorial;
pub mod form_of;
pub mod formatting;
pub mod labels;
pub mod letters;
pub mod links;
pub mod names;
pub mod residual;
pub mod taxonomy;
pub mod usage;
pub mod whitespace;

/// Rules 1 to 11, in application order
pub fn default_rules() -> Vec<Arc<dyn RewriteRule>> {
    vec![
        Arc::new(editorial::EditorialRule),
        Arc::new(editorial::DateQualifierRule),
        Arc::new(labels::LabelRule),
        Arc::new(taxonomy::TaxonomyRule),
        Arc::new(letters::LetterRule),
        Arc::new(form_of::FormOfRule),
        Arc::new(names::NameRule),
        Arc::new(usage::UsageRule),
        Arc::new(links::LinkRule),
        Arc::new(formatting::FormattingRule),
        Arc::new(residual::ResidualRule),
    ]
}

/// Run `render` over every invocation of `text`, innermost first
pub(crate) fn rewrite_invocations<F>(text: &str, mut render: F) -> Result<String, RuleError>
where
    F: FnMut(&Invocation) -> Result<Option<String>, RuleError>,
{
    if !text.contains("{{") {
        return Ok(text.to_string());
    }
    Ok(map_invocations(text, &mut render)?)
}

/// Positional arguments without a leading language code.
///
/// The first argument is only treated as a language code when more
/// arguments follow it.
pub(crate) fn content_arguments(invocation: &Invocation) -> Vec<&str> {
    let positional = invocation.positional();
    match positional.split_first() {
        Some((first, rest)) if !rest.is_empty() && looks_like_language_code(first) => rest.to_vec(),
        _ => positional,
    }
}

/// Positional arguments after the mandatory language code
pub(crate) fn arguments_after_language(invocation: &Invocation) -> Vec<&str> {
    invocation.positional().into_iter().skip(1).collect()
}

/// "a"/"an" for the following word
pub(crate) fn indefinite_article(word: &str) -> &'static str {
    match word.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "An",
        _ => "A",
    }
}
