/*!
 * Dependency discovery.
 *
 * Finds the templates and modules a piece of text needs: direct
 * invocations, `#invoke:` module calls, redirect targets of template bodies
 * and `require`/`mw.loadData` calls inside module bodies.
 */

use std::collections::BTreeSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dependencies::{DependencyKind, DependencyName};
use crate::markup::{Invocation, scan_invocations};

static MODULE_LOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:require|mw\.loadData|mw\.loadJsonData)\s*\(?\s*["']Module:([^"']+)["']"#)
        .unwrap()
});

static REDIRECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*#redirect\s*:?\s*\[\[\s*template\s*:\s*([^\]|#]+)").unwrap()
});

static NOINCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<noinclude>.*?(?:</noinclude>|$)").unwrap());

// Innermost constructs only; used when the balanced scanner gives up.
static FLAT_INVOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").unwrap());

/// Parser-function and magic-word prefixes written as `{{prefix:...}}`
const MAGIC_PREFIXES: &[&str] = &[
    "lc", "uc", "lcfirst", "ucfirst", "ns", "nse", "fullurl", "localurl", "canonicalurl",
    "urlencode", "anchorencode", "formatnum", "padleft", "padright", "plural", "grammar",
    "gender", "int", "msg", "msgnw", "raw", "tag", "filepath", "displaytitle", "defaultsort",
    "pagesincategory", "language",
];

/// Magic variables written as `{{NAME}}`
const MAGIC_VARIABLES: &[&str] = &[
    "!", "=", "PAGENAME", "PAGENAMEE", "FULLPAGENAME", "BASEPAGENAME", "ROOTPAGENAME",
    "SUBPAGENAME", "TALKPAGENAME", "NAMESPACE", "NAMESPACENUMBER", "SITENAME", "SERVER",
    "CURRENTYEAR", "CURRENTMONTH", "CURRENTDAY", "CURRENTTIME", "CURRENTTIMESTAMP",
    "REVISIONID", "REVISIONUSER",
];

/// Dependencies invoked by `text`, outer and nested alike
pub fn scan_text(text: &str) -> BTreeSet<DependencyName> {
    let mut names = BTreeSet::new();
    if !text.contains("{{") {
        return names;
    }

    match scan_invocations(text) {
        Ok(spans) => {
            for span in spans {
                if let Some(name) = classify(&Invocation::parse(span.inner(text))) {
                    names.insert(name);
                }
            }
        }
        Err(e) => {
            debug!("Falling back to flat dependency scan: {}", e);
            for caps in FLAT_INVOCATION.captures_iter(text) {
                if let Some(name) = classify(&Invocation::parse(&caps[1])) {
                    names.insert(name);
                }
            }
        }
    }
    names
}

/// Dependencies needed by a fetched body
pub fn scan_body(kind: DependencyKind, body: &str) -> BTreeSet<DependencyName> {
    match kind {
        DependencyKind::Template => {
            let transcluded = NOINCLUDE.replace_all(body, "");
            let mut names = scan_text(&transcluded);
            if let Some(target) = redirect_target(body) {
                names.insert(DependencyName::template(&target));
            }
            names
        }
        DependencyKind::Module => MODULE_LOAD
            .captures_iter(body)
            .map(|caps| DependencyName::module(caps[1].trim()))
            .collect(),
    }
}

/// Target title of a `#REDIRECT [[Template:X]]` body
pub fn redirect_target(body: &str) -> Option<String> {
    REDIRECT
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .filter(|target| !target.is_empty())
}

fn classify(invocation: &Invocation) -> Option<DependencyName> {
    if let Some(module) = invocation.invoked_module() {
        return (!module.contains('{')).then(|| DependencyName::module(module));
    }

    let name = invocation.name.as_str();
    if name.is_empty() || name.starts_with('#') || name.contains(['{', '}', '[', '<']) {
        return None;
    }
    if let Some((prefix, _)) = name.split_once(':') {
        let prefix = prefix.trim();
        if MAGIC_PREFIXES.contains(&prefix.to_lowercase().as_str()) || MAGIC_VARIABLES.contains(&prefix) {
            return None;
        }
    }
    if MAGIC_VARIABLES.contains(&name) {
        return None;
    }
    Some(DependencyName::template(name))
}
