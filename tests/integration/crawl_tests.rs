//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock catalog servers and test
//! the full crawl cycle end-to-end over HTTP.

use listing_ripple::config::{parse_config, Config, OutputConfig, OutputFormat};
use listing_ripple::crawler::{run_crawl, Coordinator, HttpPageSource};
use listing_ripple::output::{open_sink, JsonLinesSink, MemorySink};
use listing_ripple::storage::{RunStatus, SqliteStorage, Storage};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATALOG_PATH: &str = "/lista/elado-lakas";

/// Creates a test configuration for a mock catalog with all delays switched off
fn create_test_config(base_url: &str, max_pages: u32, filter: &str) -> Config {
    parse_config(&format!(
        r#"
        [search]
        url = "{base_url}{CATALOG_PATH}?page=1"
        max-pages = {max_pages}
        origin = "{base_url}"

        [filter]
        {filter}

        [crawler]
        retry-base-delay-ms = 0
        page-delay-ms = 0
        challenge-wait-ms = 0
        jitter-ms = 0
        fetch-timeout-secs = 2
        request-timeout-secs = 10
        "#
    ))
    .expect("Failed to parse test config")
}

fn source_for(config: &Config) -> HttpPageSource {
    HttpPageSource::new(&config.identity, config.crawler.fetch_timeout())
        .expect("Failed to build HTTP client")
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    let body: String = body.into();
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn card(id: u32, price: &str) -> String {
    format!(
        r#"<article class="listing-card" data-listing-id="{id}">
            <a href="/{id}"><img data-src="/thumbs/{id}.jpg"></a>
            <div class="listing__price">{price}</div>
            <div class="listing__address">Budapest, XIII. kerület</div>
            <div class="listing__area-size">62 m²</div>
            <div class="listing__rooms">3 szoba</div>
        </article>"#
    )
}

fn broken_card() -> String {
    r#"<article><a href="http://[broken">hiba</a><div class="price">1 Ft</div></article>"#.to_string()
}

fn page(cards: &[String]) -> String {
    format!(
        "<html><head><title>Eladó lakás</title></head><body>{}</body></html>",
        cards.concat()
    )
}

#[tokio::test]
async fn test_full_crawl_stops_at_empty_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Page 1: 12 cards inside the price range, 6 above it, 2 with broken links
    let mut cards: Vec<String> = (1..=12).map(|id| card(id, "85 900 000 Ft")).collect();
    cards.extend((13..=18).map(|id| card(id, "120 000 000 Ft")));
    cards.push(broken_card());
    cards.push(broken_card());
    assert_eq!(cards.len(), 20);

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(page(&cards)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "2"))
        .respond_with(html(page(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "3"))
        .respond_with(html(page(&[card(99, "85 000 000 Ft")])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &base_url,
        2,
        "min-price = 80_000_000\nmax-price = 90_000_000",
    );
    let source = source_for(&config);
    let sink = MemorySink::new();

    let report = run_crawl(&config.search.url, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.total_emitted, 12);
    assert_eq!(report.filtered_out, 6);
    assert_eq!(report.card_errors, 2);
    assert_eq!(report.failed_requests, 0);

    let listings = sink.listings();
    assert_eq!(listings.len(), 12);
    let first = &listings[0];
    assert_eq!(first.listing_id.as_deref(), Some("1"));
    assert_eq!(first.price, "85 900 000 Ft");
    assert_eq!(first.price_value, Some(85_900_000));
    assert_eq!(first.size_value, Some(62));
    assert_eq!(first.link, format!("{}/1", base_url));
    assert_eq!(first.image_url, format!("{}/thumbs/1.jpg", base_url));
    assert_eq!(
        first.source_url,
        format!("{}{}?page=1", base_url, CATALOG_PATH)
    );
}

#[tokio::test]
async fn test_challenge_interstitial_is_waited_out() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let interstitial = "<html><head><title>Just a moment...</title></head>\
                        <body><div id=\"challenge-platform\"></div></body></html>";

    // Served first, twice, with the status Cloudflare-style interstitials use
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_raw(interstitial, "text/html"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(html(page(&[card(1, "50 000 000 Ft"), card(2, "60 000 000 Ft")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 1, "");
    let source = source_for(&config);
    let sink = MemorySink::new();

    let report = run_crawl(&config.search.url, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.total_emitted, 2);
    assert_eq!(report.failed_requests, 0);
}

#[tokio::test]
async fn test_dead_seed_reaches_failure_handler() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 3, "");
    let source = source_for(&config);
    let sink = MemorySink::new();
    let failures = Mutex::new(Vec::new());

    let report = Coordinator::new(&config.search.url, &config, &source, &sink)
        .expect("Failed to create coordinator")
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
    assert!(sink.is_empty());

    let failures = failures.into_inner().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, config.search.url);
    assert!(failures[0].1.contains("404"));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(html(page(&[card(7, "40 000 000 Ft")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 1, "");
    let source = source_for(&config);
    let sink = MemorySink::new();

    let report = run_crawl(&config.search.url, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.total_emitted, 1);
    assert_eq!(report.failed_requests, 0);
}

#[tokio::test]
async fn test_timed_out_attempt_is_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Slower than the 2s fetch timeout, well inside the 10s request budget
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(
            html(page(&[card(8, "40 000 000 Ft")])).set_delay(Duration::from_secs(4)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(html(page(&[card(8, "40 000 000 Ft")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 1, "");
    let source = source_for(&config);
    let sink = MemorySink::new();

    let report = run_crawl(&config.search.url, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.total_emitted, 1);
    assert_eq!(report.failed_requests, 0);
}

#[tokio::test]
async fn test_browser_header_profile_is_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(header("pragma", "no-cache"))
        .and(header("cache-control", "no-cache"))
        .and(header("upgrade-insecure-requests", "1"))
        .and(header("sec-fetch-dest", "document"))
        .and(header("sec-fetch-mode", "navigate"))
        .and(header("sec-fetch-site", "none"))
        .respond_with(html(page(&[card(3, "30 000 000 Ft")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 1, "");
    let source = source_for(&config);
    let sink = MemorySink::new();

    let report = run_crawl(&config.search.url, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.failed_requests, 0);
    assert_eq!(report.total_emitted, 1);
}

#[tokio::test]
async fn test_redirected_catalog_paginates_from_served_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let served = format!("{}{}?page=1", base_url, CATALOG_PATH);

    Mock::given(method("GET"))
        .and(path("/regi-lista"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", served.as_str()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let first = format!(
        "<html><body>{}<a rel=\"next\" href=\"?page=2\">›</a></body></html>",
        card(1, "10 000 000 Ft")
    );
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(first))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "2"))
        .respond_with(html(page(&[card(2, "20 000 000 Ft")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 2, "");
    let source = source_for(&config);
    let sink = MemorySink::new();
    let seed = format!("{}/regi-lista?page=1", base_url);

    let report = run_crawl(&seed, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.total_emitted, 2);
    assert_eq!(report.failed_requests, 0);
    assert_eq!(sink.listings()[0].source_url, served);
}

#[tokio::test]
async fn test_structured_data_fallback_to_jsonl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let body = format!(
        r#"<html><head>
        <script type="application/ld+json">{{"@type": "ItemList", "itemListElement": [
            {{"@type": "ListItem", "item": {{"@type": "RealEstateListing", "identifier": 501,
              "url": "{base_url}/501", "offers": {{"price": 45000000}},
              "address": {{"streetAddress": "Szeged, Kárász utca 4."}}, "floorSize": {{"value": 48}}}}}},
            {{"@type": "ListItem", "item": {{"@type": "RealEstateListing", "identifier": 502,
              "url": "{base_url}/502", "offers": {{"price": 52000000}}}}}}
        ]}}</script>
        </head><body><div id="app"></div></body></html>"#
    );

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(html(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let out_path = dir.path().join("listings.jsonl");

    let config = create_test_config(&base_url, 1, "max-price = 50_000_000");
    let source = source_for(&config);
    let sink = JsonLinesSink::open(&out_path).expect("Failed to open output");

    let report = run_crawl(&config.search.url, &config, &source, &sink)
        .await
        .expect("Crawl failed to start");

    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.total_emitted, 1);
    assert_eq!(report.filtered_out, 1);

    let content = std::fs::read_to_string(&out_path).expect("Failed to read output");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);

    let json: serde_json::Value = serde_json::from_str(lines[0]).expect("Invalid JSON line");
    assert_eq!(json["listingId"], "501");
    assert_eq!(json["priceValue"], 45_000_000);
    assert_eq!(json["address"], "Szeged, Kárász utca 4.");
    assert_eq!(json["sizeValue"], 48);
}

#[tokio::test]
async fn test_sqlite_output_records_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(page(&[card(1, "10 Ft"), card(2, "20 Ft")])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .and(query_param("page", "2"))
        .respond_with(html(page(&[card(2, "20 Ft"), card(3, "30 Ft")])))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("listings.db");
    let output = OutputConfig {
        format: OutputFormat::Sqlite,
        path: db_path.to_string_lossy().into_owned(),
    };

    let config = create_test_config(&base_url, 2, "");
    let source = source_for(&config);
    let sink = open_sink(&output, &config.search.url, "test-hash").expect("Failed to open sink");

    let report = run_crawl(&config.search.url, &config, &source, sink.as_ref())
        .await
        .expect("Crawl failed to start");
    drop(sink);

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.total_emitted, 3);
    assert_eq!(report.duplicates, 1);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    assert_eq!(storage.count_listings().expect("Failed to count"), 3);

    let run = storage
        .get_latest_run()
        .expect("Failed to load run")
        .expect("No run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.pages_processed, 2);
    assert_eq!(run.total_emitted, 3);
}
