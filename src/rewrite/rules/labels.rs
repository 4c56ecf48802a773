/*!
 * Rule 3: usage labels, qualifiers and glosses.
 *
 * `{{lb|en|informal|_|chiefly|US}}` becomes `(informal chiefly, US) `.
 * Labels are comma-joined, `_` joins its neighbours with a space, `and`/`or`
 * join with the word itself, and an "outside ..." label is attached to the
 * label before it.
 */

use crate::errors::RuleError;
use crate::language_utils::looks_like_language_code;
use crate::markup::Invocation;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::rewrite_invocations;

const LABEL_TEMPLATES: &[&str] = &["lb", "lbl", "label", "tlb"];
const LEGACY_LABEL_TEMPLATES: &[&str] = &["context", "cx"];
const GRAMMATICAL_LABELS: &[&str] = &[
    "transitive",
    "intransitive",
    "ambitransitive",
    "countable",
    "uncountable",
    "reflexive",
];
const QUALIFIERS: &[&str] = &["qualifier", "qual", "q", "i", "qf", "qualifier-lite"];
const GLOSSES: &[&str] = &["gloss", "gl"];
const NON_GLOSSES: &[&str] = &["non-gloss definition", "non-gloss", "ngd", "n-g"];

/// Renders labels, qualifiers and glosses
pub struct LabelRule;

impl RewriteRule for LabelRule {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            let key = invocation.key.as_str();
            let rendered = if LABEL_TEMPLATES.contains(&key) {
                render_labels(invocation.positional().into_iter().skip(1))
            } else if LEGACY_LABEL_TEMPLATES.contains(&key) {
                render_labels(legacy_labels(invocation).into_iter())
            } else if GRAMMATICAL_LABELS.contains(&key) {
                format!("({}) ", key)
            } else if QUALIFIERS.contains(&key) {
                render_qualifier(invocation)
            } else if GLOSSES.contains(&key) {
                invocation
                    .positional_at(0)
                    .map(|gloss| format!("({})", gloss))
                    .unwrap_or_default()
            } else if NON_GLOSSES.contains(&key) {
                invocation.positional_at(0).unwrap_or_default().to_string()
            } else {
                return Ok(None);
            };
            Ok(Some(rendered))
        })
    }
}

/// `{{context}}` takes its language as `lang=` but sometimes positionally
fn legacy_labels(invocation: &Invocation) -> Vec<&str> {
    let positional = invocation.positional();
    match positional.split_first() {
        Some((first, rest))
            if invocation.named("lang").is_none() && !rest.is_empty() && looks_like_language_code(first) =>
        {
            rest.to_vec()
        }
        _ => positional,
    }
}

fn render_labels<'a, I>(labels: I) -> String
where
    I: Iterator<Item = &'a str>,
{
    let mut groups: Vec<String> = Vec::new();
    let mut glue: Option<&str> = None;

    for label in labels.map(str::trim).filter(|label| !label.is_empty()) {
        match label {
            "_" => glue = Some(" "),
            "and" => glue = Some(" and "),
            "or" => glue = Some(" or "),
            _ => match (glue.take(), groups.last_mut()) {
                (Some(joiner), Some(last)) => {
                    last.push_str(joiner);
                    last.push_str(label);
                }
                (None, Some(last)) if label.starts_with("outside") => {
                    last.push(' ');
                    last.push_str(label);
                }
                _ => groups.push(label.to_string()),
            },
        }
    }

    if groups.is_empty() {
        String::new()
    } else {
        format!("({}) ", groups.join(", "))
    }
}

fn render_qualifier(invocation: &Invocation) -> String {
    let parts: Vec<&str> = invocation
        .positional()
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("({}) ", parts.join(", "))
    }
}
