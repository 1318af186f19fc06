//! Interstitial challenge detection

use crate::extract::normalize_text;
use scraper::{Html, Selector};

/// Phrases shown by anti-automation interstitials
pub const SIGNATURES: &[&str] = &[
    "just a moment",
    "checking your browser",
    "verify you are human",
    "attention required",
    "please wait while we verify",
    "enable javascript and cookies to continue",
];

/// Element ids and classes used by challenge widgets
pub const MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf-challenge",
    "challenge-platform",
    "cf-turnstile",
];

/// Amount of leading body text inspected for a signature
const BODY_PREFIX_CHARS: usize = 600;

/// What gave a challenge page away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeSignal {
    /// A signature phrase in the document title
    Title(&'static str),
    /// A signature phrase near the top of the visible body text
    BodyText(&'static str),
    /// A challenge widget id or class in the markup
    Marker(&'static str),
}

/// Inspects a page's markup for an interstitial challenge
///
/// # Examples
///
/// ```
/// use listing_ripple::challenge::{detect_challenge, ChallengeSignal};
///
/// let page = "<html><head><title>Just a moment...</title></head><body></body></html>";
/// assert_eq!(detect_challenge(page), Some(ChallengeSignal::Title("just a moment")));
/// ```
pub fn detect_challenge(markup: &str) -> Option<ChallengeSignal> {
    let document = Html::parse_document(markup);

    let title = first_text(&document, "title").to_lowercase();
    if let Some(signature) = find_signature(&title) {
        return Some(ChallengeSignal::Title(signature));
    }

    let body = leading_body_text(&document).to_lowercase();
    if let Some(signature) = find_signature(&body) {
        return Some(ChallengeSignal::BodyText(signature));
    }

    find_marker(&document).map(ChallengeSignal::Marker)
}

/// Whether the markup is a challenge page
pub fn is_challenge(markup: &str) -> bool {
    detect_challenge(markup).is_some()
}

fn find_signature(text: &str) -> Option<&'static str> {
    SIGNATURES.iter().copied().find(|s| text.contains(s))
}

fn find_marker(document: &Html) -> Option<&'static str> {
    let Ok(selector) = Selector::parse("[id], [class]") else {
        return None;
    };

    document.select(&selector).find_map(|element| {
        let value = element.value();
        let names = format!(
            "{} {}",
            value.attr("id").unwrap_or(""),
            value.attr("class").unwrap_or("")
        )
        .to_lowercase();
        MARKERS.iter().copied().find(|m| names.contains(m))
    })
}

fn first_text(document: &Html, css: &str) -> String {
    let Ok(selector) = Selector::parse(css) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|e| normalize_text(Some(&e.text().collect::<String>())))
        .unwrap_or_default()
}

/// Visible body text, truncated to the inspected prefix
///
/// Script, style and noscript contents are not visible and are skipped.
fn leading_body_text(document: &Html) -> String {
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&selector).next() else {
        return String::new();
    };

    let mut raw = String::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|e| matches!(e.name(), "script" | "style" | "noscript"))
            .unwrap_or(false);
        if hidden {
            continue;
        }

        raw.push_str(text);
        raw.push(' ');
        if raw.len() > BODY_PREFIX_CHARS * 4 {
            break;
        }
    }

    normalize_text(Some(&raw))
        .chars()
        .take(BODY_PREFIX_CHARS)
        .collect()
}
