/*!
 * Language utilities for ISO language code handling.
 *
 * Maps the language codes used as first argument of many templates
 * (ISO 639-1 or ISO 639-3, as Wiktionary uses them) to English display names.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Names preferred over the ISO reference names, which are sometimes
/// qualified ("Spanish; Castilian") or historical
const PREFERRED_NAMES: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("de", "German"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("el", "Greek"),
    ("ro", "Romanian"),
    ("ca", "Catalan"),
    ("ky", "Kyrgyz"),
    ("pa", "Punjabi"),
];

/// Map an ISO 639-2/B code to its ISO 639-2/T form
fn bibliographic_to_terminologic(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(part2t)
}

/// Look up a 2- or 3-letter code
fn lookup(code: &str) -> Option<Language> {
    match code.len() {
        2 => Language::from_639_1(code),
        3 => {
            let part2t = bibliographic_to_terminologic(code).unwrap_or(code);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Get the English language name for a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if let Some((_, name)) = PREFERRED_NAMES.iter().find(|(c, _)| *c == normalized_code) {
        return Ok(name.to_string());
    }

    let lang = lookup(&normalized_code)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))?;

    // Reference names can carry alternatives ("Spanish; Castilian")
    let name = lang.to_name();
    Ok(name.split(';').next().unwrap_or(name).trim().to_string())
}

/// Whether a template argument looks like a language code (`en`, `enm`, `en-GB`)
pub fn looks_like_language_code(value: &str) -> bool {
    let mut parts = value.split('-');
    let Some(base) = parts.next() else {
        return false;
    };
    (2..=3).contains(&base.len())
        && base.chars().all(|c| c.is_ascii_lowercase())
        && parts.all(|part| (2..=3).contains(&part.len()) && part.chars().all(|c| c.is_ascii_alphabetic()))
}
