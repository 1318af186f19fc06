//! Listing-Ripple main entry point
//!
//! This is the command-line interface for the Listing-Ripple catalog crawler.

use anyhow::{bail, Context};
use clap::Parser;
use listing_ripple::config::{load_config_with_hash, validate, Config, OutputFormat};
use listing_ripple::crawler::{run_crawl, HttpPageSource};
use listing_ripple::output::{open_sink, print_report, print_statistics};
use listing_ripple::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing-Ripple: a patient real-estate catalog crawler
///
/// Listing-Ripple walks a paginated listing catalog page by page, waits out
/// anti-automation interstitials, extracts listing cards and writes the
/// listings that pass the configured price and size filters.
#[derive(Parser, Debug)]
#[command(name = "listing-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A patient real-estate catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl this catalog URL instead of the configured one
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Override the configured page budget
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the SQLite output and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(url) = cli.url {
        config.search.url = url;
    }
    if let Some(max_pages) = cli.max_pages {
        config.search.max_pages = max_pages;
    }
    validate(&config).context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_ripple=info,warn"),
            1 => EnvFilter::new("listing_ripple=debug,info"),
            2 => EnvFilter::new("listing_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let origin = config.origin()?;
    let criteria = config.criteria();

    println!("=== Listing-Ripple Dry Run ===\n");

    println!("Search:");
    println!("  Seed: {}", config.search.url);
    println!("  Origin: {}", origin);
    println!("  Max pages: {}", config.search.max_pages);

    println!("\nFilter:");
    if criteria.is_empty() {
        println!("  (none, every listing is emitted)");
    } else {
        print_bound("Price", config.filter.min_price, config.filter.max_price);
        print_bound("Size", config.filter.min_size, config.filter.max_size);
    }

    println!("\nCrawler:");
    println!("  Fetch attempts: {}", config.crawler.max_fetch_attempts);
    println!("  Retry base delay: {}ms", config.crawler.retry_base_delay_ms);
    println!(
        "  Challenge waits: {} x {}ms",
        config.crawler.max_challenge_waits, config.crawler.challenge_wait_ms
    );
    println!(
        "  Page delay: {}ms (+ up to {}ms jitter)",
        config.crawler.page_delay_ms, config.crawler.jitter_ms
    );
    println!(
        "  Fetch timeout: {}s per attempt, request budget: {}s",
        config.crawler.fetch_timeout_secs, config.crawler.request_timeout_secs
    );

    println!("\nIdentity:");
    println!("  User agent: {}", config.identity.user_agent);
    println!("  Accept-Language: {}", config.identity.accept_language);
    if let Some(proxy) = &config.identity.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl up to {} pages starting at {}",
        config.search.max_pages, config.search.url
    );

    Ok(())
}

fn print_bound(name: &str, min: Option<u64>, max: Option<u64>) {
    match (min, max) {
        (None, None) => {}
        (Some(min), None) => println!("  {}: >= {}", name, min),
        (None, Some(max)) => println!("  {}: <= {}", name, max),
        (Some(min), Some(max)) => println!("  {}: {} - {}", name, min, max),
    }
}

/// Handles the --stats mode: shows statistics from the output database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    if config.output.format != OutputFormat::Sqlite {
        bail!("--stats requires `format = \"sqlite\"` in the [output] table");
    }

    println!("Database: {}\n", config.output.path);

    let storage = SqliteStorage::new(Path::new(&config.output.path))
        .with_context(|| format!("Failed to open {}", config.output.path))?;
    print_statistics(&storage)?;

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let source = HttpPageSource::new(&config.identity, config.crawler.fetch_timeout())
        .context("Failed to build HTTP client")?;
    let sink = open_sink(&config.output, &config.search.url, config_hash)
        .with_context(|| format!("Failed to open output {}", config.output.path))?;

    let report = run_crawl(&config.search.url, config, &source, sink.as_ref())
        .await
        .context("Crawl could not start")?;

    print_report(&report);
    Ok(())
}
