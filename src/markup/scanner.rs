/*!
 * Balanced-delimiter scanning for template markup.
 *
 * Invocations (`{{name|arg|key=value}}`) are located with an explicit
 * delimiter stack instead of regular expressions, so names and arguments may
 * themselves contain invocations, links or template parameters
 * (`{{{1|default}}}`) without confusing the scanner.
 */

use log::debug;

use crate::errors::{MarkupError, RuleError};

/// Deepest construct nesting the scanner accepts
pub const MAX_NESTING_DEPTH: usize = 40;

/// Byte range of one `{{...}}` invocation, delimiters included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Offset of the opening `{{`
    pub start: usize,
    /// Offset just past the closing `}}`
    pub end: usize,
    /// Number of enclosing invocations
    pub depth: usize,
}

impl Span {
    /// The invocation text including its braces
    pub fn outer<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// The invocation text between its braces
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start + 2..self.end - 2]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Invocation,
    Parameter,
}

/// Locate every balanced invocation in `text`, ordered by start offset.
///
/// Unclosed openers and stray closers are treated as plain text. Returns an
/// error when nesting exceeds [`MAX_NESTING_DEPTH`].
pub fn scan_invocations(text: &str) -> Result<Vec<Span>, MarkupError> {
    let bytes = text.as_bytes();
    let mut stack: Vec<(Opener, usize)> = Vec::new();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(b"{{{") {
            stack.push((Opener::Parameter, i));
            i += 3;
        } else if rest.starts_with(b"{{") {
            stack.push((Opener::Invocation, i));
            i += 2;
        } else if rest.starts_with(b"}}") {
            match stack.last().copied() {
                Some((Opener::Parameter, _)) if rest.starts_with(b"}}}") => {
                    stack.pop();
                    i += 3;
                }
                Some((Opener::Invocation, start)) => {
                    stack.pop();
                    let depth = stack
                        .iter()
                        .filter(|(opener, _)| *opener == Opener::Invocation)
                        .count();
                    spans.push(Span { start, end: i + 2, depth });
                    i += 2;
                }
                _ => i += 2,
            }
        } else {
            i += 1;
        }

        if stack.len() > MAX_NESTING_DEPTH {
            return Err(MarkupError::NestingTooDeep { limit: MAX_NESTING_DEPTH });
        }
    }

    spans.sort_by_key(|span| span.start);
    Ok(spans)
}

/// Split the inside of an invocation on `|`, ignoring pipes nested in
/// braces or brackets.
pub fn split_params(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut braces = 0usize;
    let mut brackets = 0usize;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        match c {
            '{' => braces += 1,
            '}' => braces = braces.saturating_sub(1),
            '[' => brackets += 1,
            ']' => brackets = brackets.saturating_sub(1),
            '|' if braces == 0 && brackets == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// Normalise a construct or page title: strips substitution prefixes, maps
/// underscores to spaces and collapses whitespace. Case is preserved.
pub fn normalize_title(raw: &str) -> String {
    let mut name = raw.trim();
    for prefix in ["safesubst:", "subst:"] {
        if name.len() >= prefix.len() && name[..prefix.len()].eq_ignore_ascii_case(prefix) {
            name = name[prefix.len()..].trim_start();
        }
    }
    name.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One argument of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Unnamed argument
    Positional(String),
    /// `key=value` argument
    Named {
        /// Argument name
        key: String,
        /// Argument value
        value: String,
    },
}

impl Argument {
    fn parse(raw: &str) -> Self {
        if let Some(eq) = raw.find('=') {
            let key = raw[..eq].trim();
            let is_key = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ' ');
            if is_key {
                return Self::Named {
                    key: key.to_string(),
                    value: raw[eq + 1..].trim().to_string(),
                };
            }
        }
        Self::Positional(raw.trim().to_string())
    }
}

/// A parsed invocation: its name and ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Name as written, normalised with [`normalize_title`]
    pub name: String,
    /// Lower-cased name used for rule matching
    pub key: String,
    /// Arguments in source order
    pub arguments: Vec<Argument>,
}

impl Invocation {
    /// Parse the text between an invocation's braces
    pub fn parse(inner: &str) -> Self {
        let mut parts = split_params(inner).into_iter();
        let name = normalize_title(parts.next().unwrap_or_default());
        let key = name.to_lowercase();
        let arguments = parts.map(Argument::parse).collect();
        Self { name, key, arguments }
    }

    /// Positional arguments in order
    pub fn positional(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .filter_map(|argument| match argument {
                Argument::Positional(value) => Some(value.as_str()),
                Argument::Named { .. } => None,
            })
            .collect()
    }

    /// The positional argument at `index`, if present and non-empty
    pub fn positional_at(&self, index: usize) -> Option<&str> {
        self.positional()
            .get(index)
            .copied()
            .filter(|value| !value.is_empty())
    }

    /// Value of a named argument, if present and non-empty
    pub fn named(&self, key: &str) -> Option<&str> {
        self.arguments.iter().find_map(|argument| match argument {
            Argument::Named { key: k, value } if k == key && !value.is_empty() => {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    /// The same invocation under another name
    pub fn renamed(&self, name: &str) -> Self {
        let name = normalize_title(name);
        Self {
            key: name.to_lowercase(),
            name,
            arguments: self.arguments.clone(),
        }
    }

    /// Source form, `{{name|arg|key=value}}`
    pub fn render(&self) -> String {
        let mut out = format!("{{{{{}", self.name);
        for argument in &self.arguments {
            out.push('|');
            match argument {
                Argument::Positional(value) => out.push_str(value),
                Argument::Named { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
            }
        }
        out.push_str("}}");
        out
    }

    /// Module name of a `{{#invoke:Module|function}}` construct
    pub fn invoked_module(&self) -> Option<&str> {
        let lower = self.name.to_ascii_lowercase();
        if lower.starts_with("#invoke:") {
            let module = self.name["#invoke:".len()..].trim();
            (!module.is_empty()).then_some(module)
        } else {
            None
        }
    }
}

/// Rewrite every invocation in `text`, innermost first.
///
/// The callback sees each invocation after its arguments were rewritten.
/// `Ok(Some(text))` replaces the construct, `Ok(None)` keeps it, and an error
/// keeps that one construct and moves on to the next. Only scanner errors
/// abort the whole rewrite.
pub fn map_invocations<F>(text: &str, rewrite: &mut F) -> Result<String, MarkupError>
where
    F: FnMut(&Invocation) -> Result<Option<String>, RuleError>,
{
    rewrite_level(text, rewrite, 0)
}

fn rewrite_level<F>(text: &str, rewrite: &mut F, level: usize) -> Result<String, MarkupError>
where
    F: FnMut(&Invocation) -> Result<Option<String>, RuleError>,
{
    if level > MAX_NESTING_DEPTH {
        return Err(MarkupError::NestingTooDeep { limit: MAX_NESTING_DEPTH });
    }
    if !text.contains("{{") {
        return Ok(text.to_string());
    }

    let spans = scan_invocations(text)?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for span in spans.iter().filter(|span| span.depth == 0) {
        out.push_str(&text[cursor..span.start]);
        let inner = rewrite_level(span.inner(text), rewrite, level + 1)?;
        let invocation = Invocation::parse(&inner);

        match rewrite(&invocation) {
            Ok(Some(replacement)) => out.push_str(&replacement),
            Ok(None) => push_construct(&mut out, &inner),
            Err(e) => {
                debug!("Leaving '{{{{{}}}}}' untouched: {}", invocation.name, e);
                push_construct(&mut out, &inner);
            }
        }
        cursor = span.end;
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}

fn push_construct(out: &mut String, inner: &str) {
    out.push_str("{{");
    out.push_str(inner);
    out.push_str("}}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanInvocations_withNestedConstructs_shouldReportDepth() {
        let text = "a {{m|en|{{l|en|cat}}}} b {{q|x}}";
        let spans = scan_invocations(text).unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].outer(text), "{{m|en|{{l|en|cat}}}}");
        assert_eq!(spans[0].depth, 0);
        assert_eq!(spans[1].inner(text), "l|en|cat");
        assert_eq!(spans[1].depth, 1);
        assert_eq!(spans[2].inner(text), "q|x");
    }

    #[test]
    fn test_scanInvocations_withTemplateParameter_shouldSkipParameter() {
        let text = "{{foo|{{{1|bar}}}}}";
        let spans = scan_invocations(text).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].inner(text), "foo|{{{1|bar}}}");
    }

    #[test]
    fn test_scanInvocations_withUnbalancedBraces_shouldIgnoreStrays() {
        let spans = scan_invocations("}} {{open {{q|x}}").unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].depth, 1);
    }

    #[test]
    fn test_scanInvocations_withPathologicalNesting_shouldFail() {
        let text = format!("{}x{}", "{{a|".repeat(100), "}}".repeat(100));
        assert!(scan_invocations(&text).is_err());
    }

    #[test]
    fn test_splitParams_withNestedPipes_shouldSplitTopLevelOnly() {
        let parts = split_params("form of|en|[[a|b]]|{{l|en|c}}|t=x");
        assert_eq!(parts, vec!["form of", "en", "[[a|b]]", "{{l|en|c}}", "t=x"]);
    }

    #[test]
    fn test_invocationParse_shouldClassifyArguments() {
        let invocation = Invocation::parse(" Alternative_spelling of |en|colour|t=hue");
        assert_eq!(invocation.name, "Alternative spelling of");
        assert_eq!(invocation.key, "alternative spelling of");
        assert_eq!(invocation.positional(), vec!["en", "colour"]);
        assert_eq!(invocation.named("t"), Some("hue"));
        assert_eq!(invocation.positional_at(5), None);
    }

    #[test]
    fn test_invocationParse_withLinkContainingEquals_shouldStayPositional() {
        let invocation = Invocation::parse("q|[[a=b]]");
        assert_eq!(invocation.positional(), vec!["[[a=b]]"]);
    }

    #[test]
    fn test_invokedModule_shouldReturnModuleName() {
        let invocation = Invocation::parse("#invoke:form of/templates|form_of_t");
        assert_eq!(invocation.invoked_module(), Some("form of/templates"));
        assert_eq!(Invocation::parse("l|en|x").invoked_module(), None);
    }

    #[test]
    fn test_renamed_shouldRenderWithNewName() {
        let invocation = Invocation::parse("alt form|en|colour|t=hue").renamed("alternative form of");
        assert_eq!(invocation.key, "alternative form of");
        assert_eq!(invocation.render(), "{{alternative form of|en|colour|t=hue}}");
    }

    #[test]
    fn test_normalizeTitle_shouldStripSubstAndUnderscores() {
        assert_eq!(normalize_title("subst:given__name "), "given name");
        assert_eq!(normalize_title("  Latn-def"), "Latn-def");
    }

    #[test]
    fn test_mapInvocations_shouldRewriteInnermostFirst() {
        let mut seen = Vec::new();
        let out = map_invocations("{{m|en|{{l|en|cat}}}}", &mut |inv: &Invocation| {
            seen.push(inv.name.clone());
            Ok(inv.positional_at(1).map(str::to_string))
        })
        .unwrap();
        assert_eq!(out, "cat");
        assert_eq!(seen, vec!["l", "m"]);
    }

    #[test]
    fn test_mapInvocations_withFailingMatch_shouldKeepThatConstruct() {
        let out = map_invocations("{{bad}} {{good|x}}", &mut |inv: &Invocation| {
            if inv.key == "bad" {
                Err(RuleError::Unsupported { rule: "test", construct: inv.name.clone() })
            } else {
                Ok(Some("ok".to_string()))
            }
        })
        .unwrap();
        assert_eq!(out, "{{bad}} ok");
    }
}
