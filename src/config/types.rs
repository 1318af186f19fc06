use serde::Deserialize;

/// Main configuration structure for Listing-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the crawl starts and how far it goes
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Seed catalog URL
    pub url: String,

    /// Page budget, counting the seed page
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Origin used to resolve relative links and images.
    /// Defaults to the origin of the seed URL.
    #[serde(default)]
    pub origin: Option<String>,
}

/// Numeric bounds applied to every extracted listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "min-price", default)]
    pub min_price: Option<u64>,

    #[serde(rename = "max-price", default)]
    pub max_price: Option<u64>,

    #[serde(rename = "min-size", default)]
    pub min_size: Option<u64>,

    #[serde(rename = "max-size", default)]
    pub max_size: Option<u64>,
}

/// Retry, backoff and pacing behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Attempts per request before it is abandoned
    #[serde(rename = "max-fetch-attempts", default = "default_attempts")]
    pub max_fetch_attempts: u32,

    /// Waits spent on a challenge page before extraction proceeds anyway
    #[serde(rename = "max-challenge-waits", default = "default_attempts")]
    pub max_challenge_waits: u32,

    /// Fixed wait between challenge re-inspections (milliseconds)
    #[serde(rename = "challenge-wait-ms", default = "default_challenge_wait_ms")]
    pub challenge_wait_ms: u64,

    /// Base delay for fetch retries, doubled on every attempt (milliseconds)
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Pause between catalog pages (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Upper bound of the random jitter added to every wait (milliseconds)
    #[serde(rename = "jitter-ms", default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Network timeout of a single fetch attempt (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Wall-clock budget for fetching and clearing one page, retries included (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_fetch_attempts: default_attempts(),
            max_challenge_waits: default_attempts(),
            challenge_wait_ms: default_challenge_wait_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            page_delay_ms: default_page_delay_ms(),
            jitter_ms: default_jitter_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Header profile presented to the target site
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    /// Already-resolved proxy URL, if the crawl goes through one
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            proxy: None,
        }
    }
}

/// Output sink selection
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Path of the JSON-lines file or SQLite database
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Sqlite,
}

fn default_max_pages() -> u32 {
    5
}

fn default_attempts() -> u32 {
    3
}

fn default_challenge_wait_ms() -> u64 {
    5_000
}

fn default_retry_base_delay_ms() -> u64 {
    2_000
}

fn default_page_delay_ms() -> u64 {
    2_500
}

fn default_jitter_ms() -> u64 {
    1_500
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "hu-HU,hu;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

fn default_output_path() -> String {
    "./listings.jsonl".to_string()
}
