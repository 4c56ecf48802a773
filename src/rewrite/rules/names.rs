/*!
 * Rule 7: proper-noun constructs.
 *
 * Given names, surnames, places, demonyms and city nicknames render fixed
 * sentence shapes such as "A male given name from Hebrew" or "A city in
 * Texas, USA".
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::RuleError;
use crate::markup::Invocation;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::{arguments_after_language, indefinite_article, rewrite_invocations};

const GENDERS: &[&str] = &["male", "female", "unisex"];

/// Holonym arguments of `{{place}}` (`s/Texas`, `c/USA`, `co:Suf/Suffolk`)
static HOLONYM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+(?::[A-Za-z]+)?/(.+)$").unwrap());

/// Renders name and place constructs
pub struct NameRule;

impl RewriteRule for NameRule {
    fn name(&self) -> &'static str {
        "names"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            let rendered = match invocation.key.as_str() {
                "given name" => render_given_name(invocation),
                "surname" => match invocation.named("from") {
                    Some(origin) => format!("A surname from {}", origin),
                    None => "A surname".to_string(),
                },
                "place" => render_place(invocation),
                "demonym-noun" => described("A native or inhabitant", "of", invocation),
                "demonym-adj" => described("Of or relating to", "", invocation),
                "city nickname" => described("A nickname", "for", invocation),
                _ => return Ok(None),
            };
            Ok(Some(rendered))
        })
    }
}

fn render_given_name(invocation: &Invocation) -> String {
    let gender = invocation.named("gender").or_else(|| {
        arguments_after_language(invocation)
            .into_iter()
            .find(|arg| GENDERS.contains(arg))
    });

    let mut out = match gender {
        Some(gender) => format!("A {} given name", gender),
        None => "A given name".to_string(),
    };
    if let Some(origin) = invocation.named("from") {
        out.push_str(" from ");
        out.push_str(origin);
    }
    if let Some(diminutive) = invocation.named("dim").or_else(|| invocation.named("diminutive")) {
        out.push_str(", diminutive of ");
        out.push_str(diminutive);
    }
    out
}

/// `{{place|en|city|s/Texas|c/USA}}` -> "A city in Texas, USA"
fn render_place(invocation: &Invocation) -> String {
    let args = arguments_after_language(invocation);
    let Some(place_type) = args.first().filter(|arg| !arg.is_empty()) else {
        return "A place".to_string();
    };

    let place_type = place_type
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" and ");

    let locations: Vec<&str> = args
        .iter()
        .skip(1)
        .filter_map(|arg| HOLONYM.captures(arg))
        .filter_map(|caps| caps.get(1))
        .map(|location| location.as_str().trim())
        .collect();

    let article = indefinite_article(&place_type);
    if locations.is_empty() {
        format!("{} {}", article, place_type)
    } else {
        format!("{} {} in {}", article, place_type, locations.join(", "))
    }
}

/// `<lead> <preposition> <subject>`, or just `<lead>` when the subject is absent
fn described(lead: &str, preposition: &str, invocation: &Invocation) -> String {
    match invocation.positional_at(1) {
        Some(subject) if preposition.is_empty() => format!("{} {}", lead, subject),
        Some(subject) => format!("{} {} {}", lead, preposition, subject),
        None => lead.to_string(),
    }
}
