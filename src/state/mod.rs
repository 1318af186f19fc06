//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: counters and seen-sets owned by the coordinator for one run
//! - `CrawlReport`: the summary handed back to the caller when the run ends

mod crawl_state;

pub use crawl_state::{CrawlReport, CrawlState, FailedRequest};
