use crate::config::types::{Config, CrawlerConfig, FilterConfig, IdentityConfig, SearchConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_filter_config(&config.filter)?;
    validate_crawler_config(&config.crawler)?;
    validate_identity_config(&config.identity)?;

    if config.output.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed URL, origin and page budget
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    validate_http_url("search url", &config.url)?;

    if let Some(origin) = &config.origin {
        validate_http_url("origin", origin)?;
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Rejects inverted ranges
fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    check_range("price", config.min_price, config.max_price)?;
    check_range("size", config.min_size, config.max_size)
}

fn check_range(name: &str, min: Option<u64>, max: Option<u64>) -> Result<(), ConfigError> {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "min-{name} ({min}) is greater than max-{name} ({max})"
            )));
        }
    }
    Ok(())
}

/// Validates retry and pacing limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_fetch_attempts < 1 || config.max_fetch_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-fetch-attempts must be between 1 and 10, got {}",
            config.max_fetch_attempts
        )));
    }

    if config.max_challenge_waits > 10 {
        return Err(ConfigError::Validation(format!(
            "max-challenge-waits must be <= 10, got {}",
            config.max_challenge_waits
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    // The request budget wraps all attempts; a budget that one slow attempt
    // can use up leaves no room for the retries.
    let needed = config.worst_case_fetch_time();
    if config.request_timeout() < needed {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs ({}) must cover {} attempts of fetch-timeout-secs ({}) plus retry delays ({:?} in total)",
            config.request_timeout_secs,
            config.max_fetch_attempts,
            config.fetch_timeout_secs,
            needed
        )));
    }

    Ok(())
}

fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(())
}
