/*!
 * Rule 4: taxonomic names.
 */

use crate::errors::RuleError;
use crate::markup::Invocation;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::rewrite_invocations;

const NAME_WRAPPERS: &[&str] = &[
    "taxfmt",
    "taxlink",
    "taxlinknew",
    "taxlinkwiki",
    "specieslink",
    "vern",
];

/// Collapses scientific-name wrappers to the name itself
pub struct TaxonomyRule;

impl RewriteRule for TaxonomyRule {
    fn name(&self) -> &'static str {
        "taxonomy"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            let key = invocation.key.as_str();
            if NAME_WRAPPERS.contains(&key) {
                return Ok(Some(invocation.positional_at(0).unwrap_or_default().to_string()));
            }
            if key == "taxon" {
                return render_taxon(invocation).map(Some);
            }
            Ok(None)
        })
    }
}

/// `{{taxon|genus|family|Rosaceae}}` -> "A taxonomic genus within the family Rosaceae"
fn render_taxon(invocation: &Invocation) -> Result<String, RuleError> {
    let rank = invocation.positional_at(0).ok_or_else(|| RuleError::Unsupported {
        rule: "taxonomy",
        construct: invocation.render(),
    })?;

    match (invocation.positional_at(1), invocation.positional_at(2)) {
        (Some(parent_rank), Some(parent)) => Ok(format!(
            "A taxonomic {} within the {} {}",
            rank, parent_rank, parent
        )),
        _ => Ok(format!("A taxonomic {}", rank)),
    }
}
