/*!
 * Rule 6: "form of" relations.
 *
 * These constructs say that the entry is a variant of a lemma:
 * `{{alternative spelling of|en|colour|t=hue}}` becomes
 * `alternative spelling of colour ("hue")`. Inflection constructs list
 * grammatical attributes instead: `{{inflection of|en|be||1|s|pres|ind}}`
 * becomes `1-s-pres-ind of be`.
 */

use crate::errors::RuleError;
use crate::markup::{Invocation, collapse_wikilinks};
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::{content_arguments, rewrite_invocations};

/// Relations rendered as `<relation> <lemma>`
const RELATIONS: &[&str] = &[
    "alternative spelling of",
    "alternative form of",
    "alternative case form of",
    "alternative typography of",
    "obsolete spelling of",
    "obsolete form of",
    "obsolete typography of",
    "archaic spelling of",
    "archaic form of",
    "dated spelling of",
    "dated form of",
    "rare spelling of",
    "rare form of",
    "nonstandard spelling of",
    "nonstandard form of",
    "informal spelling of",
    "informal form of",
    "pronunciation spelling of",
    "eye dialect of",
    "misspelling of",
    "standard spelling of",
    "short for",
    "abbreviation of",
    "initialism of",
    "acronym of",
    "clipping of",
    "contraction of",
    "ellipsis of",
    "plural of",
    "singular of",
    "past of",
    "past tense of",
    "past participle of",
    "present participle of",
    "third-person singular of",
    "comparative of",
    "superlative of",
    "gerund of",
    "imperative of",
    "infinitive of",
    "conjugation of",
    "romanization of",
    "combining form of",
    "diminutive of",
    "augmentative of",
    "feminine of",
    "masculine of",
    "female equivalent of",
    "male equivalent of",
    "agent noun of",
    "verbal noun of",
    "synonym of",
    "euphemism for",
    "form of",
];

/// Shortcut names and language-specific variants of the relations above
const ALIASES: &[(&str, &str)] = &[
    ("alt form", "alternative form of"),
    ("alt form of", "alternative form of"),
    ("alt sp", "alternative spelling of"),
    ("alt spelling", "alternative spelling of"),
    ("alt sp of", "alternative spelling of"),
    ("alt case", "alternative case form of"),
    ("obs sp", "obsolete spelling of"),
    ("obs form", "obsolete form of"),
    ("abbr of", "abbreviation of"),
    ("abbrev of", "abbreviation of"),
    ("init of", "initialism of"),
    ("pl of", "plural of"),
    ("syn of", "synonym of"),
    ("en-past of", "past of"),
    ("en-simple past of", "past tense of"),
    ("en-third-person singular of", "third-person singular of"),
    ("en-ing form of", "present participle of"),
    ("en-comparative of", "comparative of"),
    ("en-superlative of", "superlative of"),
];

const INFLECTIONS: &[&str] = &["inflection of", "infl of"];

/// Arguments that separate attribute groups rather than name attributes
const ATTRIBUTE_SEPARATORS: &[&str] = &[";", "//", ","];

/// Renders relational "form of" constructs
pub struct FormOfRule;

impl RewriteRule for FormOfRule {
    fn name(&self) -> &'static str {
        "form-of"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            let key = invocation.key.as_str();
            if INFLECTIONS.contains(&key) {
                return Ok(Some(render_inflection(invocation)));
            }
            Ok(relation_for(key).map(|relation| render_relation(relation, invocation)))
        })
    }
}

/// Canonical relation for a construct name, if it is one
pub fn relation_for(key: &str) -> Option<&'static str> {
    RELATIONS
        .iter()
        .copied()
        .find(|relation| *relation == key)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == key)
                .map(|(_, relation)| *relation)
        })
}

/// Lemma, alternative display and trailing arguments of a relation
struct FormArguments {
    lemma: Option<String>,
    display: Option<String>,
    trailing: Vec<String>,
}

fn form_arguments(invocation: &Invocation) -> FormArguments {
    let args: Vec<String> = content_arguments(invocation)
        .into_iter()
        .map(|arg| collapse_wikilinks(arg).trim().to_string())
        .collect();

    let Some(lemma_index) = args.iter().position(|arg| !arg.is_empty()) else {
        return FormArguments { lemma: None, display: None, trailing: Vec::new() };
    };

    FormArguments {
        lemma: Some(args[lemma_index].clone()),
        display: args.get(lemma_index + 1).filter(|arg| !arg.is_empty()).cloned(),
        trailing: args.iter().skip(lemma_index + 2).cloned().collect(),
    }
}

fn render_relation(relation: &str, invocation: &Invocation) -> String {
    let arguments = form_arguments(invocation);
    let Some(lemma) = arguments.display.or(arguments.lemma) else {
        return relation
            .trim_end_matches(" of")
            .trim_end_matches(" for")
            .to_string();
    };

    let gloss = invocation
        .named("t")
        .or_else(|| invocation.named("gloss"))
        .map(collapse_wikilinks)
        .or_else(|| arguments.trailing.into_iter().find(|arg| !arg.is_empty()));

    match gloss {
        Some(gloss) => format!("{} {} (\"{}\")", relation, lemma, gloss),
        None => format!("{} {}", relation, lemma),
    }
}

fn render_inflection(invocation: &Invocation) -> String {
    let arguments = form_arguments(invocation);
    let Some(lemma) = arguments.display.or(arguments.lemma) else {
        return "form of".to_string();
    };

    let attributes: Vec<String> = arguments
        .trailing
        .into_iter()
        .filter(|arg| !arg.is_empty() && !ATTRIBUTE_SEPARATORS.contains(&arg.as_str()))
        .collect();

    if attributes.is_empty() {
        format!("form of {}", lemma)
    } else {
        format!("{} of {}", attributes.join("-"), lemma)
    }
}
