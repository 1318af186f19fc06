//! Configuration module for Listing-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ripple.toml")).unwrap();
//! println!("Crawling {} for up to {} pages", config.search.url, config.search.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, FilterConfig, IdentityConfig, OutputConfig, OutputFormat, SearchConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;

use crate::filter::FilterCriteria;
use crate::ConfigError;
use std::time::Duration;
use url::Url;

impl Config {
    /// Origin used to resolve relative links, falling back to the seed's origin
    pub fn origin(&self) -> Result<Url, ConfigError> {
        let raw = self.search.origin.as_deref().unwrap_or(&self.search.url);
        let mut origin = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid origin '{}': {}", raw, e)))?;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        Ok(origin)
    }

    /// Filter criteria as read from the `[filter]` table
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            min_price: self.filter.min_price,
            max_price: self.filter.max_price,
            min_size: self.filter.min_size,
            max_size: self.filter.max_size,
        }
    }
}

impl CrawlerConfig {
    pub fn challenge_wait(&self) -> Duration {
        Duration::from_millis(self.challenge_wait_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Longest time the fetch attempts of one request can take
    ///
    /// Every attempt runs into the fetch timeout and every retry waits its
    /// full doubled delay plus the maximum jitter.
    pub fn worst_case_fetch_time(&self) -> Duration {
        let attempts = self.max_fetch_attempts.max(1);
        let mut total = self.fetch_timeout().saturating_mul(attempts);
        for attempt in 1..attempts {
            let exponent = (attempt - 1).min(16);
            total = total
                .saturating_add(self.retry_base_delay().saturating_mul(1u32 << exponent))
                .saturating_add(self.jitter());
        }
        total
    }
}
