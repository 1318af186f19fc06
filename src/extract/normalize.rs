//! Text cleanup shared by every extracted field

/// Non-breaking and fixed-width space code points found in listing markup
const NBSP_CHARS: &[char] = &['\u{00A0}', '\u{2007}', '\u{202F}'];

/// Cleans a raw text fragment
///
/// Non-breaking spaces become regular spaces, whitespace runs collapse to a
/// single space and the result is trimmed. Missing input yields an empty
/// string.
///
/// # Examples
///
/// ```
/// use listing_ripple::normalize_text;
///
/// assert_eq!(normalize_text(Some("  85\u{a0}900\u{a0}000 Ft \n")), "85 900 000 Ft");
/// assert_eq!(normalize_text(None), "");
/// ```
pub fn normalize_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    text.split(|c: char| c.is_whitespace() || NBSP_CHARS.contains(&c))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes an optional field, mapping blank results to `None`
pub fn normalize_field(text: Option<&str>) -> Option<String> {
    let cleaned = normalize_text(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
