//! Crawler module for walking a paginated catalog
//!
//! This module contains the core crawling logic, including:
//! - The `PageSource` seam and its HTTP implementation
//! - Retry spacing and the `Waiter` suspension capability
//! - The FIFO frontier and next-page discovery
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod pagination;
mod waiter;

pub use coordinator::{run_crawl, Coordinator, FailureHandler};
pub use fetcher::{build_http_client, FetchedPage, HttpPageSource, PageSource, RetryPolicy};
pub use frontier::{CrawlRequest, Frontier};
pub use pagination::resolve_next;
pub use waiter::{RecordingWaiter, TokioWaiter, Waiter};

pub use crate::state::CrawlReport;
