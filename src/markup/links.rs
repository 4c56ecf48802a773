/*!
 * Link and reference handling: collapsing internal and external links to
 * their display text and removing footnote references.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]|]*)(?:\|([^\[\]]*))?\]\]").unwrap());

static EXTERNAL_LINK_WITH_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:https?:)?//[^\s\]]+\s+([^\]]+)\]").unwrap());

static BARE_EXTERNAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:https?:)?//[^\s\]]+\]").unwrap());

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<ref[^>]*/>|<ref[^>]*>.*?</ref\s*>").unwrap());

static ESCAPED_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)&lt;ref(?:[^&]|&[^g])*?/&gt;|&lt;ref.*?&gt;.*?&lt;/ref\s*&gt;").unwrap()
});

const DROPPED_NAMESPACES: [&str; 3] = ["category:", "file:", "image:"];
const INTERWIKI_PREFIXES: [&str; 2] = ["wikipedia:", "w:"];

/// Replace `[[target|display]]` with its display text, or the target when no
/// display text is given. Category and file links are removed, anchors and
/// encyclopedia prefixes are dropped from bare targets.
pub fn collapse_wikilinks(text: &str) -> String {
    if !text.contains("[[") {
        return text.to_string();
    }
    WIKILINK
        .replace_all(text, |caps: &Captures| {
            let target = caps[1].trim();
            if is_dropped_namespace(target) {
                return String::new();
            }
            match caps.get(2).map(|m| m.as_str().trim()) {
                Some(display) if !display.is_empty() => display.to_string(),
                _ => bare_target(target),
            }
        })
        .into_owned()
}

fn is_dropped_namespace(target: &str) -> bool {
    let lower = target.trim_start_matches(':').to_lowercase();
    DROPPED_NAMESPACES.iter().any(|ns| lower.starts_with(ns))
}

fn bare_target(target: &str) -> String {
    let mut target = target.trim_start_matches(':');
    for prefix in INTERWIKI_PREFIXES {
        if target.len() >= prefix.len() && target[..prefix.len()].eq_ignore_ascii_case(prefix) {
            target = &target[prefix.len()..];
            break;
        }
    }
    match target.split_once('#') {
        Some(("", anchor)) => anchor.trim().to_string(),
        Some((page, _)) => page.trim().to_string(),
        None => target.trim().to_string(),
    }
}

/// Replace `[http://host text]` with its text and drop bare bracketed URLs
pub fn collapse_external_links(text: &str) -> String {
    if !text.contains('[') {
        return text.to_string();
    }
    let labelled = EXTERNAL_LINK_WITH_TEXT.replace_all(text, "$1");
    BARE_EXTERNAL_LINK.replace_all(&labelled, "").into_owned()
}

/// Remove `<ref>` footnotes, including their entity-escaped spelling
pub fn strip_references(text: &str) -> String {
    if !text.contains("ref") {
        return text.to_string();
    }
    let plain = REFERENCE.replace_all(text, "");
    ESCAPED_REFERENCE.replace_all(&plain, "").into_owned()
}
