//! Page sources and the HTTP fetcher
//!
//! This module handles all page retrieval for the crawler, including:
//! - The `PageSource` seam the coordinator fetches through
//! - Building the reqwest client with a browser-like header profile
//! - Error classification into transient and permanent failures
//! - Retry spacing for transient failures

use crate::challenge::is_challenge;
use crate::config::IdentityConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA,
    UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, Proxy};
use std::time::Duration;
use url::Url;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Fetch metadata a browser sends for a top-level navigation typed into the address bar
const FETCH_METADATA: [(&str, &str); 3] = [
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
];

/// A page as returned by a page source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: Url,
    /// URL after redirects
    pub final_url: Url,
    /// HTTP status of the response
    pub status: u16,
    /// Page markup
    pub body: String,
}

impl FetchedPage {
    /// A successful page that was not redirected
    pub fn ok(url: Url, body: impl Into<String>) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            body: body.into(),
        }
    }
}

/// Fetch/render capability the crawler depends on
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Retrieves the page at `url`
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Looks at an already-fetched page again, after a challenge wait
    ///
    /// The default implementation fetches the original URL again. Sources
    /// that keep a live rendering can return its current document instead.
    async fn reinspect(&self, page: &FetchedPage) -> Result<FetchedPage, FetchError> {
        self.fetch(&page.url).await
    }
}

/// Page source backed by a plain reqwest client
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Builds a source presenting the configured identity
    ///
    /// # Arguments
    ///
    /// * `identity` - Header profile and optional proxy
    /// * `timeout` - Network timeout of a single fetch attempt
    pub fn new(identity: &IdentityConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(identity, timeout)?,
        })
    }
}

/// Builds an HTTP client with the browser-like header profile
///
/// # Example
///
/// ```no_run
/// use listing_ripple::config::IdentityConfig;
/// use listing_ripple::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&IdentityConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    identity: &IdentityConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    for (name, value) in FETCH_METADATA {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    match HeaderValue::from_str(&identity.accept_language) {
        Ok(value) => {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        Err(_) => tracing::warn!(
            "Ignoring invalid accept-language {:?}",
            identity.accept_language
        ),
    }

    let mut builder = Client::builder()
        .user_agent(identity.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &identity.proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.is_empty() && !content_type.contains("html") {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        // Interstitials are usually served with 403 or 503. They are handed
        // to the challenge gate instead of being treated as failures.
        if !status.is_success() && !is_challenge(&body) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest failure onto the crawler's error taxonomy
fn classify_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_builder() || e.is_redirect() {
        FetchError::Client {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Transient {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Spacing of fetch retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following failed attempt number `attempt`
    ///
    /// Attempts are numbered from 1; the delay doubles with every failure.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Whether another attempt is allowed after `error` on attempt `attempt`
    pub fn should_retry(&self, attempt: u32, error: &FetchError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&IdentityConfig::default(), Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[test]
    fn test_unsupported_proxy_scheme_rejected() {
        let identity = IdentityConfig {
            proxy: Some("ftp://proxy.example:21".to_string()),
            ..Default::default()
        };
        assert!(build_http_client(&identity, Duration::from_secs(30)).is_err());
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        };
        let transient = FetchError::Status {
            url: "https://ingatlan.com/".to_string(),
            status: 503,
        };
        let permanent = FetchError::Status {
            url: "https://ingatlan.com/".to_string(),
            status: 404,
        };

        assert!(policy.should_retry(1, &transient));
        assert!(policy.should_retry(2, &transient));
        assert!(!policy.should_retry(3, &transient));
        assert!(!policy.should_retry(1, &permanent));
    }

    #[test]
    fn test_fetched_page_ok() {
        let url = Url::parse("https://ingatlan.com/lista").unwrap();
        let page = FetchedPage::ok(url.clone(), "<html></html>");
        assert_eq!(page.final_url, url);
        assert_eq!(page.status, 200);
    }
}
