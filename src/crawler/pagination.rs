//! Next-page discovery
//!
//! An explicit "next" link in the markup is preferred. When there is none,
//! the next page is derived by rewriting the `page` query parameter of the
//! current URL.

use crate::url::{resolve_href, url_key, with_page_param};
use scraper::{Html, Selector};
use url::Url;

/// Selectors for explicit next-page links, in order of preference
const NEXT_SELECTORS: &[&str] = &[
    r#"a[rel="next"]"#,
    r#"link[rel="next"]"#,
    ".pagination__next",
    r#"[aria-label="Következő"]"#,
];

/// Resolves the URL of the page after `current_url`
///
/// # Returns
///
/// `None` when the page budget is spent, the page had no listings, or the
/// only candidate is the current page itself.
pub fn resolve_next(
    document: &Html,
    current_url: &Url,
    page_index: u32,
    max_pages: u32,
    listings_found: usize,
    origin: &Url,
) -> Option<Url> {
    if page_index >= max_pages || listings_found == 0 {
        return None;
    }

    let current_key = url_key(current_url.as_str());

    if let Some(next) = explicit_next(document, current_url, origin) {
        if url_key(next.as_str()) != current_key {
            return Some(next);
        }
    }

    let derived = with_page_param(current_url, page_index + 1);
    (url_key(derived.as_str()) != current_key).then_some(derived)
}

/// First explicit next link that resolves to a page on the catalog's host
fn explicit_next(document: &Html, current_url: &Url, origin: &Url) -> Option<Url> {
    NEXT_SELECTORS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .flat_map(|selector| {
            document
                .select(&selector)
                .filter_map(|element| element.value().attr("href"))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .find_map(|href| match resolve_href(&href, current_url) {
            Ok(Some(url)) if url.host_str() == origin.host_str() => Some(url),
            Ok(Some(url)) => {
                tracing::debug!("Ignoring off-site next link {}", url);
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Ignoring unresolvable next link {:?}: {}", href, e);
                None
            }
        })
}
