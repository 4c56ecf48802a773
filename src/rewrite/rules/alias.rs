/*!
 * Template redirects, applied before every other rule.
 *
 * A fetched template body of the form `#REDIRECT [[Template:alternative form of]]`
 * makes its name an alias; invocations of the alias are renamed to the
 * target so the specific rules recognise them.
 */

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::RuleError;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::rewrite_invocations;

/// Renames aliased invocations to their redirect targets
#[derive(Debug, Clone)]
pub struct AliasRule {
    /// Lower-cased alias -> target title
    aliases: Arc<HashMap<String, String>>,
}

impl AliasRule {
    pub const NAME: &'static str = "alias";

    pub fn new(aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(alias, target)| (alias.to_lowercase(), target))
            .collect();
        Self { aliases: Arc::new(aliases) }
    }
}

impl RewriteRule for AliasRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            Ok(self
                .aliases
                .get(&invocation.key)
                .filter(|target| target.to_lowercase() != invocation.key)
                .map(|target| invocation.renamed(target).render()))
        })
    }
}
