use crate::UrlError;
use url::Url;

/// Query parameter carrying the catalog page number
pub const PAGE_PARAM: &str = "page";

/// Resolves a link or image reference found in page markup
///
/// Absolute references are kept as they are; scheme-less ones (`/12345`,
/// `//cdn.host/img.jpg`, `kep.jpg`) are resolved against `base`.
///
/// # Returns
///
/// * `Ok(None)` - The reference is empty or points nowhere useful
///   (`javascript:`, `mailto:`, `tel:`, `data:`, fragment-only)
/// * `Ok(Some(Url))` - The resolved HTTP(S) URL
/// * `Err(UrlError)` - The reference is malformed
pub fn resolve_href(href: &str, base: &Url) -> Result<Option<Url>, UrlError> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Ok(None);
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return Ok(None);
    }

    let resolved = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    match resolved.scheme() {
        "http" | "https" => Ok(Some(resolved)),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}

/// Returns `url` with its page-number query parameter set to `page`
///
/// Other query parameters keep their order; an existing page parameter is
/// replaced in place rather than duplicated.
pub fn with_page_param(url: &Url, page: u32) -> Url {
    let mut next = url.clone();
    let page = page.to_string();

    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == PAGE_PARAM {
                replaced = true;
                (k.into_owned(), page.clone())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    {
        let mut query = next.query_pairs_mut();
        query.clear().extend_pairs(pairs);
        if !replaced {
            query.append_pair(PAGE_PARAM, &page);
        }
    }

    next
}
