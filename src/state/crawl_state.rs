//! Per-run crawl state
//!
//! One [`CrawlState`] lives for exactly one crawl run. It is owned by the
//! coordinator and only mutated between suspension points, so it needs no
//! locking under the single-worker model.

use crate::extract::DedupKey;
use crate::url::url_key;
use std::collections::HashSet;

/// A request that was abandoned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRequest {
    pub url: String,
    pub reason: String,
}

/// Counters and seen-sets for a single crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    /// Pages fetched and processed, including pages with zero listings
    pub pages_processed: u32,

    /// Listings accepted by the sink
    pub total_emitted: u64,

    /// Records rejected by the filter criteria
    pub filtered_out: u64,

    /// Records dropped as duplicates of an earlier record
    pub duplicates: u64,

    /// Records the sink failed to accept
    pub sink_failures: u64,

    /// Cards skipped because reading them failed
    pub card_errors: u64,

    /// Requests abandoned after exhausting their attempts
    pub failed_requests: Vec<FailedRequest>,

    seen_urls: HashSet<String>,
    seen_listing_ids: HashSet<String>,
    seen_links: HashSet<String>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL as scheduled; returns false if it was already seen
    ///
    /// URLs are compared in normalized form, so `…/lista/?page=2` and
    /// `…/lista?page=2` are the same request.
    pub fn mark_url_seen(&mut self, url: &str) -> bool {
        self.seen_urls.insert(url_key(url))
    }

    /// Returns true if a listing with this key was already emitted
    pub fn has_seen_listing(&self, key: &DedupKey) -> bool {
        match key {
            DedupKey::ListingId(id) => self.seen_listing_ids.contains(id),
            DedupKey::Link(link) => self.seen_links.contains(link),
        }
    }

    /// Marks a listing as emitted; returns false for a duplicate
    pub fn mark_listing_seen(&mut self, key: &DedupKey) -> bool {
        match key {
            DedupKey::ListingId(id) => self.seen_listing_ids.insert(id.clone()),
            DedupKey::Link(link) => self.seen_links.insert(link.clone()),
        }
    }

    pub fn record_failure(&mut self, url: &str, reason: &str) {
        self.failed_requests.push(FailedRequest {
            url: url.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Final report for the run
    pub fn report(&self) -> CrawlReport {
        CrawlReport {
            pages_processed: self.pages_processed,
            total_emitted: self.total_emitted,
            filtered_out: self.filtered_out,
            duplicates: self.duplicates,
            sink_failures: self.sink_failures,
            card_errors: self.card_errors,
            failed_requests: self.failed_requests.len() as u32,
        }
    }
}

/// Summary returned at the end of a crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub pages_processed: u32,
    pub total_emitted: u64,
    pub filtered_out: u64,
    pub duplicates: u64,
    pub sink_failures: u64,
    pub card_errors: u64,
    pub failed_requests: u32,
}
