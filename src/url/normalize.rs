use crate::UrlError;
use url::Url;

/// Query parameters that never change which catalog page is served
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref"];

/// Normalizes a URL into the form used as request identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host (the `url` crate already lowercases scheme and host)
/// 3. Remove dot segments, duplicate slashes and the trailing slash (except root)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters and sort the rest
///
/// Unlike the scheme and host, path case is preserved: catalog paths such as
/// `/lista/elado+lakas` are case sensitive on some sites.
///
/// # Examples
///
/// ```
/// use listing_ripple::url::normalize_url;
///
/// let url = normalize_url("https://INGATLAN.com/lista/elado+lakas/?page=2#top").unwrap();
/// assert_eq!(url.as_str(), "https://ingatlan.com/lista/elado+lakas?page=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Identity key of a URL, as stored in the crawl's seen-set
///
/// Falls back to the trimmed raw string when the URL cannot be normalized,
/// so that even a malformed URL is only ever attempted once.
pub fn url_key(url_str: &str) -> String {
    normalize_url(url_str)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| url_str.trim().trim_end_matches('/').to_string())
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
