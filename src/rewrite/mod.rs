/*!
 * Fixed-point rewriting of definition markup into plain text.
 *
 * A [`Normalizer`] owns an ordered list of [`RewriteRule`]s, each a pure
 * text-to-text transform for one family of constructs. The rules run in
 * order, repeatedly, until the text stops changing or the iteration ceiling
 * is reached; the whitespace and punctuation rule then runs exactly once.
 *
 * Normalisation never fails. A rule that returns an error is skipped for
 * that iteration and its input is passed on unchanged.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RuleError;
use crate::markup::strip_references;

pub mod rules;

/// Default fixed-point iteration ceiling
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[#*:]+\s*").unwrap());

/// One pure text transform for a family of constructs
pub trait RewriteRule: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Rewrite `text`; an error means "leave the text as it was"
    fn apply(&self, text: &str) -> Result<String, RuleError>;
}

/// Multi-pass markup normalizer
#[derive(Clone)]
pub struct Normalizer {
    rules: Vec<Arc<dyn RewriteRule>>,
    finisher: Arc<dyn RewriteRule>,
    max_iterations: usize,
}

impl Normalizer {
    /// The standard rule set, in its fixed order
    pub fn new() -> Self {
        Self {
            rules: rules::default_rules(),
            finisher: Arc::new(rules::whitespace::WhitespaceRule),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Apply template redirects (`alias -> target`) before any other rule
    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.rules.retain(|rule| rule.name() != rules::alias::AliasRule::NAME);
        if !aliases.is_empty() {
            self.rules.insert(0, Arc::new(rules::alias::AliasRule::new(aliases)));
        }
        self
    }

    /// Change the fixed-point iteration ceiling (at least one iteration runs)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Names of the iterated rules, in order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Normalise one definition line
    pub fn normalize(&self, text: &str) -> String {
        let unmarked = LIST_MARKER.replace(text, "");
        let mut current = strip_references(&unmarked);

        for iteration in 0..self.max_iterations {
            let previous = current.clone();
            for rule in &self.rules {
                current = apply_rule(rule.as_ref(), current);
            }
            if current == previous {
                break;
            }
            if iteration + 1 == self.max_iterations {
                debug!("Iteration ceiling reached, keeping residue: {}", truncate_text(&current, 60));
            }
        }

        apply_rule(self.finisher.as_ref(), current)
    }
}

fn apply_rule(rule: &dyn RewriteRule, text: String) -> String {
    match rule.apply(&text) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            debug!("Rule '{}' skipped: {}", rule.name(), e);
            text
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("rules", &self.rule_names())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

static DEFAULT_NORMALIZER: Lazy<Normalizer> = Lazy::new(Normalizer::new);

/// Normalise one definition line with the standard rule set
pub fn normalize(text: &str) -> String {
    DEFAULT_NORMALIZER.normalize(text)
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
