//! URL slug generation for route segments.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of characters that are not allowed in a slug.
static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Map common Latin diacritics and ligatures to ASCII.
fn transliterate(c: char) -> Option<&'static str> {
    Some(match c {
        'ä' | 'æ' => "ae",
        'ö' | 'œ' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'à' | 'á' | 'â' | 'ã' | 'å' | 'ā' => "a",
        'ç' | 'č' | 'ć' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' | 'ń' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ū' => "u",
        'ý' | 'ÿ' => "y",
        'ž' | 'ź' | 'ż' => "z",
        'š' | 'ś' => "s",
        'ł' => "l",
        '&' => " and ",
        _ => return None,
    })
}

/// Convert free text into a URL path segment.
///
/// - Lowercases and transliterates common diacritics (`ü` → `ue`).
/// - Collapses every run of other characters into a single `-`.
/// - Trims leading and trailing dashes.
///
/// # Examples
///
/// ```
/// use pressroom_core::slug::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Grüße aus Köln!"), "gruesse-aus-koeln");
/// assert_eq!(slugify("  --  "), "");
/// ```
pub fn slugify(text: &str) -> String {
    let mut ascii = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match transliterate(c) {
            Some(replacement) => ascii.push_str(replacement),
            None => ascii.push(c),
        }
    }

    NON_SLUG_CHARS
        .replace_all(&ascii, "-")
        .trim_matches('-')
        .to_string()
}
