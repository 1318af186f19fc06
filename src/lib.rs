//! Listing-Ripple: a patient real-estate catalog crawler
//!
//! This crate walks a paginated listing catalog one page at a time, rides out
//! anti-automation interstitials, extracts listing cards (falling back to
//! embedded JSON-LD), filters them against numeric criteria and hands the
//! survivors to an output sink.

pub mod challenge;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod filter;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Ripple operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised by a page source while fetching or rendering a page
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Transient network error for {url}: {message}")]
    Transient { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got {content_type}")]
    NotHtml { url: String, content_type: String },

    #[error("Request budget of {seconds}s exceeded for {url}")]
    BudgetExceeded { url: String, seconds: u64 },

    #[error("Client error for {url}: {message}")]
    Client { url: String, message: String },
}

impl FetchError {
    /// Returns true if the request is worth retrying
    ///
    /// Network failures, timeouts, 429 and 5xx responses are transient.
    /// Everything else abandons the request immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotHtml { .. } | Self::BudgetExceeded { .. } | Self::Client { .. } => false,
        }
    }
}

/// Result type alias for Listing-Ripple operations
pub type Result<T> = std::result::Result<T, RippleError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, Coordinator, CrawlReport};
pub use extract::{normalize_text, Listing, RawCardRecord};
pub use filter::FilterCriteria;
pub use state::CrawlState;
