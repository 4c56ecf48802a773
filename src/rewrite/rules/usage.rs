/*!
 * Rule 8: usage notes and affix examples.
 */

use crate::errors::RuleError;
use crate::markup::Invocation;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::{arguments_after_language, rewrite_invocations};

/// Inline examples and collocations, dropped from the gloss
const EXAMPLES: &[&str] = &["ux", "usex", "uxi", "collocation", "coa", "quotei"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affix {
    Any,
    Prefix,
    Suffix,
    Infix,
}

impl Affix {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "affixusex" | "afex" => Some(Self::Any),
            "prefixusex" | "prefex" => Some(Self::Prefix),
            "suffixusex" | "sufex" => Some(Self::Suffix),
            "infixusex" | "infex" => Some(Self::Infix),
            _ => None,
        }
    }
}

/// Renders usage constructs and drops inline examples
pub struct UsageRule;

impl RewriteRule for UsageRule {
    fn name(&self) -> &'static str {
        "usage"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            let key = invocation.key.as_str();
            if let Some(affix) = Affix::from_key(key) {
                return Ok(Some(render_affix(affix, invocation)));
            }
            let rendered = match key {
                "only used in" | "only in" => match non_empty_arguments(invocation).first() {
                    Some(term) => format!("Only used in {}", term),
                    None => "Only used in specific contexts".to_string(),
                },
                "used in phrasal verbs" => {
                    let verbs = non_empty_arguments(invocation);
                    if verbs.is_empty() {
                        String::new()
                    } else {
                        format!("Used in phrasal verbs such as {}", verbs.join(", "))
                    }
                }
                "construed with" => render_construed_with(invocation),
                _ if EXAMPLES.contains(&key) => String::new(),
                _ => return Ok(None),
            };
            Ok(Some(rendered))
        })
    }
}

fn non_empty_arguments(invocation: &Invocation) -> Vec<&str> {
    arguments_after_language(invocation)
        .into_iter()
        .filter(|arg| !arg.is_empty())
        .collect()
}

/// `{{prefixusex|en|un|do}}` -> "un- + do → undo"
fn render_affix(affix: Affix, invocation: &Invocation) -> String {
    let parts = non_empty_arguments(invocation);
    let (first, second) = match parts.as_slice() {
        [first, second, ..] => (*first, *second),
        _ => return String::new(),
    };

    let shown = match affix {
        Affix::Any => parts.join(" + "),
        Affix::Prefix => format!("{}- + {}", first.trim_end_matches('-'), second),
        Affix::Suffix => format!("{} + -{}", first, second.trim_start_matches('-')),
        Affix::Infix => format!("{} + -{}-", first, second.trim_matches('-')),
    };

    let result = match invocation.named("result") {
        Some(result) => result.to_string(),
        None if affix == Affix::Infix => return shown,
        None => parts.iter().map(|part| part.trim_matches('-')).collect(),
    };

    format!("{} → {}", shown, result)
}

/// `{{construed with|en|of|about}}` -> `(construed with "of" or "about")`
fn render_construed_with(invocation: &Invocation) -> String {
    let words = non_empty_arguments(invocation);
    if words.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = words.iter().map(|word| format!("\"{}\"", word)).collect();
    format!("(construed with {})", quoted.join(" or "))
}
