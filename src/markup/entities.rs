/*!
 * HTML character entity decoding.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

/// Decode numeric and common named entities in a single pass.
///
/// Unknown names and invalid code points are left as written, and decoded
/// text is never decoded again (`&amp;lt;` becomes `&lt;`).
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |caps: &Captures| {
            decode_one(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_one(body: &str) -> Option<String> {
    if let Some(number) = body.strip_prefix('#') {
        let code_point = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code_point).map(String::from);
    }
    named_entity(body).map(str::to_string)
}

fn named_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "shy" => "\u{ad}",
        "zwj" => "\u{200d}",
        "zwnj" => "\u{200c}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "minus" => "\u{2212}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        "times" => "\u{d7}",
        "divide" => "\u{f7}",
        "deg" => "\u{b0}",
        "prime" => "\u{2032}",
        "Prime" => "\u{2033}",
        "frac12" => "\u{bd}",
        "frac14" => "\u{bc}",
        "frac34" => "\u{be}",
        "sect" => "\u{a7}",
        "para" => "\u{b6}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        "harr" => "\u{2194}",
        _ => return None,
    };
    Some(decoded)
}
