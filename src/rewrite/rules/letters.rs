/*!
 * Rule 5: letter definitions.
 *
 * `{{Latn-def|en|letter|1|A}}` becomes "The first letter of the English
 * alphabet, called A and written in the Latin script."
 */

use crate::errors::RuleError;
use crate::language_utils::get_language_name;
use crate::markup::Invocation;
use crate::rewrite::RewriteRule;
use crate::rewrite::rules::rewrite_invocations;

const ORDINALS: [&str; 26] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
    "tenth", "eleventh", "twelfth", "thirteenth", "fourteenth", "fifteenth", "sixteenth",
    "seventeenth", "eighteenth", "nineteenth", "twentieth", "twenty-first", "twenty-second",
    "twenty-third", "twenty-fourth", "twenty-fifth", "twenty-sixth",
];

/// Renders Latin-script letter definitions
pub struct LetterRule;

impl RewriteRule for LetterRule {
    fn name(&self) -> &'static str {
        "letters"
    }

    fn apply(&self, text: &str) -> Result<String, RuleError> {
        rewrite_invocations(text, |invocation| {
            if invocation.key == "latn-def" {
                Ok(Some(render_letter(invocation)))
            } else {
                Ok(None)
            }
        })
    }
}

fn render_letter(invocation: &Invocation) -> String {
    let args = invocation.positional();
    let [language, kind, position, letter] = match args.as_slice() {
        [language, kind, position, letter, ..] => [*language, *kind, *position, *letter],
        _ => return "A letter of the alphabet.".to_string(),
    };

    let ordinal = ordinal_word(position);
    let alphabet = match get_language_name(language) {
        Ok(name) => format!("the {} alphabet", name),
        Err(_) => "the alphabet".to_string(),
    };

    match kind {
        "letter" => format!(
            "The {} letter of {}, called {} and written in the Latin script.",
            ordinal, alphabet, letter
        ),
        "ordinal" => format!(
            "The ordinal number {}, derived from this letter of {}, called {} and written in the Latin script.",
            ordinal, alphabet, letter
        ),
        other => format!("A {} based on the letter {} in the Latin script.", other, letter),
    }
}

/// Ordinal word for a 1-based position: named up to 26, "27th" beyond
pub fn ordinal_word(position: &str) -> String {
    let Ok(number) = position.trim().parse::<usize>() else {
        return format!("{}th", position.trim());
    };
    if (1..=ORDINALS.len()).contains(&number) {
        return ORDINALS[number - 1].to_string();
    }
    let suffix = match (number % 10, number % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", number, suffix)
}
