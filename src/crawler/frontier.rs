//! FIFO frontier of catalog pages waiting to be fetched

use std::collections::VecDeque;
use url::Url;

/// A catalog page queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Normalized URL of the page
    pub url: Url,

    /// 1-based position of the page in the catalog walk
    pub page_index: u32,

    /// Fetch attempts already made for this request
    pub attempt: u32,
}

impl CrawlRequest {
    /// The first page of a crawl
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            page_index: 1,
            attempt: 0,
        }
    }

    /// The page following this one
    pub fn next_page(&self, url: Url) -> Self {
        Self {
            url,
            page_index: self.page_index + 1,
            attempt: 0,
        }
    }
}

/// Requests in the order they were discovered
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<CrawlRequest>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: CrawlRequest) {
        self.queue.push_back(request);
    }

    pub fn pop(&mut self) -> Option<CrawlRequest> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
