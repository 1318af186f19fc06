//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Managing the FIFO frontier and the seen-set of page URLs
//! - Fetching with retry spacing and a per-request wall-clock budget
//! - Passing pages through the challenge gate
//! - Extraction, filtering and emission of listings
//! - Pagination and inter-page pacing

use crate::challenge::ChallengeGate;
use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchedPage, PageSource, RetryPolicy};
use crate::crawler::frontier::{CrawlRequest, Frontier};
use crate::crawler::pagination::resolve_next;
use crate::crawler::waiter::{TokioWaiter, Waiter};
use crate::extract::{extract_page, CardLayout, ExtractionSource, RawCardRecord};
use crate::filter::{self, EmitContext, FilterCriteria};
use crate::output::ListingSink;
use crate::state::{CrawlReport, CrawlState};
use crate::url::normalize_url;
use crate::FetchError;
use scraper::Html;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Callback invoked with `(url, reason)` for every abandoned request
pub type FailureHandler<'a> = Box<dyn Fn(&str, &str) + Send + Sync + 'a>;

/// What a fetched page yielded
struct PageAnalysis {
    records: Vec<RawCardRecord>,
    source: ExtractionSource,
    card_errors: usize,
    next: Option<Url>,
}

/// Main crawler coordinator structure
///
/// A coordinator drives exactly one run. It owns the run's [`CrawlState`]
/// and borrows its collaborators.
pub struct Coordinator<'a> {
    seed: Url,
    origin: Url,
    max_pages: u32,
    criteria: FilterCriteria,
    crawler: CrawlerConfig,
    retry: RetryPolicy,
    gate: ChallengeGate,
    layout: CardLayout,
    source: &'a dyn PageSource,
    sink: &'a dyn ListingSink,
    waiter: Arc<dyn Waiter + 'a>,
    on_request_failed: FailureHandler<'a>,
    state: CrawlState,
    frontier: Frontier,
}

impl<'a> Coordinator<'a> {
    /// Creates a coordinator for one run
    ///
    /// # Arguments
    ///
    /// * `seed_url` - First catalog page
    /// * `config` - Validated configuration
    /// * `source` - Where pages are fetched from
    /// * `sink` - Where listings are emitted to
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(RippleError)` - The seed URL or configured origin is invalid
    pub fn new(
        seed_url: &str,
        config: &Config,
        source: &'a dyn PageSource,
        sink: &'a dyn ListingSink,
    ) -> crate::Result<Self> {
        let seed = normalize_url(seed_url)?;
        let origin = config.origin()?;
        let crawler = config.crawler.clone();

        Ok(Self {
            seed,
            origin,
            max_pages: config.search.max_pages,
            criteria: config.criteria(),
            retry: RetryPolicy {
                max_attempts: crawler.max_fetch_attempts.max(1),
                base_delay: crawler.retry_base_delay(),
            },
            gate: ChallengeGate::from_config(&crawler),
            layout: CardLayout::standard(),
            source,
            sink,
            waiter: Arc::new(TokioWaiter::new(crawler.jitter())),
            on_request_failed: Box::new(|url, reason| {
                tracing::error!("Abandoned request for {}: {}", url, reason);
            }),
            crawler,
            state: CrawlState::new(),
            frontier: Frontier::new(),
        })
    }

    /// Replaces the default tokio-backed waiter
    pub fn with_waiter(mut self, waiter: Arc<dyn Waiter + 'a>) -> Self {
        self.waiter = waiter;
        self
    }

    /// Sets the callback invoked for abandoned requests
    pub fn with_failure_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &str) + Send + Sync + 'a,
    {
        self.on_request_failed = Box::new(handler);
        self
    }

    /// Runs the crawl until the frontier is empty
    ///
    /// Steady-state failures never end the run early: an abandoned request
    /// is reported through the failure handler and the loop moves on.
    pub async fn run(mut self) -> CrawlReport {
        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl of {} (up to {} pages)",
            self.seed,
            self.max_pages
        );

        let seed = CrawlRequest::seed(self.seed.clone());
        self.state.mark_url_seen(seed.url.as_str());
        self.frontier.push(seed);

        while let Some(request) = self.frontier.pop() {
            self.process_request(request).await;

            if !self.frontier.is_empty() {
                self.waiter.wait(self.crawler.page_delay()).await;
            }
        }

        let report = self.state.report();
        if let Err(e) = self.sink.finish(&report).await {
            tracing::warn!("Failed to finalize output: {}", e);
        }

        tracing::info!(
            "Crawl completed in {:?}: {} pages, {} listings emitted, {} filtered out, {} duplicates, {} failed requests",
            start_time.elapsed(),
            report.pages_processed,
            report.total_emitted,
            report.filtered_out,
            report.duplicates,
            report.failed_requests
        );

        report
    }

    /// Processes a single catalog page
    async fn process_request(&mut self, mut request: CrawlRequest) {
        tracing::info!("Fetching page {} ({})", request.page_index, request.url);

        let budget = self.crawler.request_timeout();
        let page = match tokio::time::timeout(budget, self.fetch_page(&mut request)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                self.abandon(&request, &e);
                return;
            }
            Err(_) => {
                let e = FetchError::BudgetExceeded {
                    url: request.url.to_string(),
                    seconds: budget.as_secs(),
                };
                self.abandon(&request, &e);
                return;
            }
        };

        // Redirects decide where the catalog really lives; later pages are
        // derived from the served URL, not the requested one.
        if page.final_url != request.url {
            tracing::debug!("{} was served from {}", request.url, page.final_url);
            self.state.mark_url_seen(page.final_url.as_str());
        }

        let analysis = self.analyze(&page, request.page_index);
        self.state.pages_processed += 1;
        self.state.card_errors += analysis.card_errors as u64;

        if analysis.records.is_empty() {
            tracing::warn!("No listings found on page {} ({})", request.page_index, request.url);
        }

        let found = analysis.records.len();
        let source_url = page.final_url.to_string();
        let summary = filter::process(
            analysis.records,
            EmitContext {
                criteria: &self.criteria,
                source_url: &source_url,
            },
            &mut self.state,
            self.sink,
        )
        .await;

        tracing::info!(
            "Page {}: {} listings found ({:?}), {} emitted, {} filtered out, {} duplicates, {} cards skipped",
            request.page_index,
            found,
            analysis.source,
            summary.emitted,
            summary.filtered_out,
            summary.duplicates,
            analysis.card_errors
        );

        if let Some(next) = analysis.next {
            if self.state.mark_url_seen(next.as_str()) {
                tracing::debug!("Queued page {}: {}", request.page_index + 1, next);
                self.frontier.push(request.next_page(next));
            } else {
                tracing::debug!("Next page {} was already visited", next);
            }
        }
    }

    /// Fetches a page with retries and passes it through the challenge gate
    async fn fetch_page(&self, request: &mut CrawlRequest) -> Result<FetchedPage, FetchError> {
        let page = loop {
            request.attempt += 1;

            match self.source.fetch(&request.url).await {
                Ok(page) => break page,
                Err(e) if self.retry.should_retry(request.attempt, &e) => {
                    let delay = self.retry.delay_after(request.attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed, retrying in {:?}: {}",
                        request.attempt,
                        self.retry.max_attempts,
                        request.url,
                        delay,
                        e
                    );
                    self.waiter.wait(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        let outcome = self.gate.clear(page, self.source, self.waiter.as_ref()).await;
        Ok(outcome.page)
    }

    /// Extracts records and resolves the next page
    ///
    /// Kept synchronous so the parsed document never lives across an await.
    fn analyze(&self, page: &FetchedPage, page_index: u32) -> PageAnalysis {
        let document = Html::parse_document(&page.body);
        let extraction = extract_page(
            &document,
            &self.layout,
            &self.origin,
            page.final_url.as_str(),
        );

        let next = resolve_next(
            &document,
            &page.final_url,
            page_index,
            self.max_pages,
            extraction.records.len(),
            &self.origin,
        );

        PageAnalysis {
            records: extraction.records,
            source: extraction.source,
            card_errors: extraction.card_errors,
            next,
        }
    }

    fn abandon(&mut self, request: &CrawlRequest, error: &FetchError) {
        let url = request.url.as_str();
        let reason = format!("{} (after {} attempts)", error, request.attempt);
        (self.on_request_failed)(url, &reason);
        self.state.record_failure(url, &reason);
    }
}

/// Runs a complete crawl
///
/// # Arguments
///
/// * `seed_url` - First catalog page
/// * `config` - Validated configuration
/// * `source` - Where pages are fetched from
/// * `sink` - Where listings are emitted to
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished
/// * `Err(RippleError)` - The seed URL or configured origin is invalid
///
/// # Example
///
/// ```no_run
/// use listing_ripple::config::load_config;
/// use listing_ripple::crawler::{run_crawl, HttpPageSource};
/// use listing_ripple::output::MemorySink;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("ripple.toml"))?;
/// let source = HttpPageSource::new(&config.identity, config.crawler.fetch_timeout())?;
/// let sink = MemorySink::new();
/// let report = run_crawl(&config.search.url, &config, &source, &sink).await?;
/// println!("{} listings", report.total_emitted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    seed_url: &str,
    config: &Config,
    source: &dyn PageSource,
    sink: &dyn ListingSink,
) -> crate::Result<CrawlReport> {
    let coordinator = Coordinator::new(seed_url, config, source, sink)?;
    Ok(coordinator.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::crawler::RecordingWaiter;
    use crate::output::MemorySink;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    const SEED: &str = "https://ingatlan.com/lista?page=1";

    fn create_test_config(max_pages: u32) -> Config {
        parse_config(&format!(
            r#"
            [search]
            url = "{SEED}"
            max-pages = {max_pages}

            [crawler]
            retry-base-delay-ms = 100
            page-delay-ms = 10
            challenge-wait-ms = 50
            jitter-ms = 0
            fetch-timeout-secs = 1
            request-timeout-secs = 4
            "#
        ))
        .unwrap()
    }

    fn catalog(prices: &[&str], next: Option<&str>) -> String {
        let cards: String = prices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                format!(
                    r#"<article data-listing-id="{i}"><a href="/{i}"></a><span class="price">{p}</span></article>"#
                )
            })
            .collect();
        let next = next
            .map(|href| format!(r#"<a rel="next" href="{href}">›</a>"#))
            .unwrap_or_default();
        format!("<html><body>{cards}{next}</body></html>")
    }

    /// Serves scripted responses per URL; unscripted URLs answer 404
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<HashMap<String, VecDeque<Result<String, FetchError>>>>,
        requests: Mutex<Vec<String>>,
        delay: Option<Duration>,
        redirects: HashMap<String, String>,
    }

    impl ScriptedSource {
        fn with(mut self, url: &str, response: Result<String, FetchError>) -> Self {
            self.responses
                .get_mut()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(response);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self
                .responses
                .lock()
                .unwrap()
                .get_mut(url.as_str())
                .and_then(|queue| queue.pop_front());
            match next {
                Some(Ok(body)) => {
                    let mut page = FetchedPage::ok(url.clone(), body);
                    if let Some(target) = self.redirects.get(url.as_str()) {
                        page.final_url = Url::parse(target).unwrap();
                    }
                    Ok(page)
                }
                Some(Err(e)) => Err(e),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn unavailable(url: &str) -> Result<String, FetchError> {
        Err(FetchError::Status {
            url: url.to_string(),
            status: 503,
        })
    }

    #[tokio::test]
    async fn test_follows_pages_up_to_budget() {
        let config = create_test_config(2);
        let source = ScriptedSource::default()
            .with(SEED, Ok(catalog(&["10 Ft", "20 Ft"], Some("/lista?page=2"))))
            .with(
                "https://ingatlan.com/lista?page=2",
                Ok(catalog(&["30 Ft"], Some("/lista?page=3"))),
            );
        let sink = MemorySink::new();
        let waiter = Arc::new(RecordingWaiter::new());

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(waiter.clone())
            .run()
            .await;

        assert_eq!(report.pages_processed, 2);
        assert_eq!(report.failed_requests, 0);
        assert_eq!(source.requests().len(), 2);
        // Listing ids restart on page 2, so its only card is a duplicate.
        assert_eq!(report.total_emitted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(waiter.waits(), vec![Duration::from_millis(10)]);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_with_doubling_delay() {
        let config = create_test_config(1);
        let source = ScriptedSource::default()
            .with(SEED, unavailable(SEED))
            .with(SEED, unavailable(SEED))
            .with(SEED, Ok(catalog(&["10 Ft"], None)));
        let sink = MemorySink::new();
        let waiter = Arc::new(RecordingWaiter::new());

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(waiter.clone())
            .run()
            .await;

        assert_eq!(report.pages_processed, 1);
        assert_eq!(report.total_emitted, 1);
        assert_eq!(source.requests().len(), 3);
        assert_eq!(
            waiter.waits(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_reach_failure_handler() {
        let config = create_test_config(1);
        let source = ScriptedSource::default()
            .with(SEED, unavailable(SEED))
            .with(SEED, unavailable(SEED))
            .with(SEED, unavailable(SEED));
        let sink = MemorySink::new();
        let failures = Mutex::new(Vec::new());

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(Arc::new(RecordingWaiter::new()))
            .with_failure_handler(|url, reason| {
                failures
                    .lock()
                    .unwrap()
                    .push((url.to_string(), reason.to_string()));
            })
            .run()
            .await;

        assert_eq!(report.pages_processed, 0);
        assert_eq!(report.failed_requests, 1);
        assert_eq!(source.requests().len(), 3);
        let failures = failures.into_inner().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SEED);
        assert!(failures[0].1.contains("503"));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let config = create_test_config(1);
        let source = ScriptedSource::default();
        let sink = MemorySink::new();

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(Arc::new(RecordingWaiter::new()))
            .with_failure_handler(|_, _| {})
            .run()
            .await;

        assert_eq!(report.failed_requests, 1);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_request_budget_abandons_slow_page() {
        let config = create_test_config(1);
        let source = ScriptedSource {
            delay: Some(Duration::from_secs(6)),
            ..Default::default()
        }
        .with(SEED, Ok(catalog(&["10 Ft"], None)));
        let sink = MemorySink::new();
        let reasons = Mutex::new(Vec::new());

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(Arc::new(RecordingWaiter::new()))
            .with_failure_handler(|_, reason| reasons.lock().unwrap().push(reason.to_string()))
            .run()
            .await;

        assert_eq!(report.pages_processed, 0);
        assert_eq!(report.failed_requests, 1);
        assert!(reasons.into_inner().unwrap()[0].contains("budget"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_visited_page_not_requeued() {
        let config = create_test_config(5);
        let source = ScriptedSource::default()
            .with(SEED, Ok(catalog(&["10 Ft"], Some("/lista?page=2"))))
            .with(
                "https://ingatlan.com/lista?page=2",
                Ok(catalog(&["20 Ft"], Some("/lista/?page=1#top"))),
            );
        let sink = MemorySink::new();

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(Arc::new(RecordingWaiter::new()))
            .run()
            .await;

        assert_eq!(report.pages_processed, 2);
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_listing_page_counts_and_stops() {
        let config = create_test_config(5);
        let source = ScriptedSource::default().with(
            SEED,
            Ok(r#"<html><body><p>Nincs találat</p><a rel="next" href="/lista?page=2">›</a></body></html>"#.to_string()),
        );
        let sink = MemorySink::new();

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(Arc::new(RecordingWaiter::new()))
            .run()
            .await;

        assert_eq!(report.pages_processed, 1);
        assert_eq!(report.total_emitted, 0);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_challenge_page_waited_out() {
        let config = create_test_config(1);
        let challenge = "<html><head><title>Just a moment...</title></head><body></body></html>";
        let source = ScriptedSource::default()
            .with(SEED, Ok(challenge.to_string()))
            .with(SEED, Ok(challenge.to_string()))
            .with(SEED, Ok(catalog(&["10 Ft"], None)));
        let sink = MemorySink::new();
        let waiter = Arc::new(RecordingWaiter::new());

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(waiter.clone())
            .run()
            .await;

        assert_eq!(report.total_emitted, 1);
        assert_eq!(
            waiter.waits(),
            vec![Duration::from_millis(50), Duration::from_millis(50)]
        );
    }

    #[tokio::test]
    async fn test_pagination_follows_redirect_target() {
        let config = create_test_config(2);
        let moved = "https://ingatlan.com/lista/elado+lakas?page=1";
        let mut source = ScriptedSource::default()
            .with(SEED, Ok(catalog(&["10 Ft"], Some("?page=2"))))
            .with(
                "https://ingatlan.com/lista/elado+lakas?page=2",
                Ok(catalog(&["20 Ft"], None)),
            );
        source.redirects.insert(SEED.to_string(), moved.to_string());
        let sink = MemorySink::new();

        let report = Coordinator::new(SEED, &config, &source, &sink)
            .unwrap()
            .with_waiter(Arc::new(RecordingWaiter::new()))
            .run()
            .await;

        assert_eq!(report.pages_processed, 2);
        assert_eq!(
            source.requests(),
            vec![
                SEED.to_string(),
                "https://ingatlan.com/lista/elado+lakas?page=2".to_string()
            ]
        );
        assert_eq!(sink.listings()[0].source_url, moved);
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let config = create_test_config(1);
        let source = ScriptedSource::default();
        let sink = MemorySink::new();
        assert!(Coordinator::new("ftp://ingatlan.com/lista", &config, &source, &sink).is_err());
    }
}
