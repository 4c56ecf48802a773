/*!
 * Rule 11: generic cleanup of every construct the earlier rules left behind.
 *
 * A construct keeps its second positional argument (`{{foo|bar|baz}}` becomes
 * `baz`) and is deleted otherwise. After this rule no `{{`/`}}` remains, which
 * is what lets the fixed-point loop terminate on unknown vocabulary.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::errors::RuleError;
use crate::markup::{Invocation, map_invocations};
use crate::rewrite::RewriteRule;

/// Upper bound on parameter substitution passes
const MAX_PARAMETER_PASSES: usize = 64;

static PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\{[^{}|]*(?:\|([^{}]*))?\}\}\}").unwrap());

/// Resolves leftover constructs generically
pub struct ResidualRule;

impl RewriteRule for ResidualRule {
    fn name(&self) -> &'static str {
        "residual"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        if !text.contains("{{") && !text.contains("}}") {
            return Ok(text.to_string());
        }

        let text = resolve_parameters(text);
        let text = match map_invocations(&text, &mut |invocation: &Invocation| {
            Ok(Some(invocation.positional_at(1).unwrap_or_default().to_string()))
        }) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                debug!("Falling back to textual deletion: {}", e);
                delete_constructs(&text)
            }
        };

        Ok(text.replace("{{", "").replace("}}", ""))
    }
}

/// `{{{1|default}}}` -> `default`, `{{{1}}}` -> ``
fn resolve_parameters(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..MAX_PARAMETER_PASSES {
        if !current.contains("{{{") {
            break;
        }
        let next = PARAMETER
            .replace_all(&current, |caps: &Captures| {
                caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default()
            })
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Textual deletion for markup the scanner rejects.
///
/// Each outermost matched `{{ ... }}` span is removed in full, however deep
/// it nests. Unmatched delimiters lose only their two characters.
fn delete_constructs(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut openers: Vec<usize> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut stray: Vec<usize> = Vec::new();

    let mut i = 0;
    while i + 1 < bytes.len() {
        match &bytes[i..i + 2] {
            b"{{" => {
                openers.push(i);
                i += 2;
            }
            b"}}" => {
                match openers.pop() {
                    Some(start) => {
                        // An enclosing span swallows the ones inside it
                        while spans.last().is_some_and(|(inner, _)| *inner > start) {
                            spans.pop();
                        }
                        spans.push((start, i + 2));
                    }
                    None => stray.push(i),
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    stray.extend(openers);
    stray.sort_unstable();

    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut spans = spans.into_iter().peekable();
    let mut stray = stray.into_iter().peekable();
    loop {
        let next_span = spans.peek().map(|(start, _)| *start);
        let next_stray = stray.peek().copied();
        let (cut_start, cut_end) = match (next_span, next_stray) {
            (Some(span), Some(token)) if token < span => {
                stray.next();
                (token, token + 2)
            }
            (Some(_), _) => match spans.next() {
                Some(span) => span,
                None => break,
            },
            (None, Some(token)) => {
                stray.next();
                (token, token + 2)
            }
            (None, None) => break,
        };
        output.push_str(&text[cursor..cut_start]);
        cursor = cut_end;
    }
    output.push_str(&text[cursor..]);
    output
}
