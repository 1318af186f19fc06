//! Output sink traits and error types
//!
//! A sink receives finalized listings one at a time. Sinks decide their own
//! retry policy; the crawler reports a failed push and moves on.

use crate::extract::Listing;
use crate::state::CrawlReport;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while emitting a listing
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to serialize listing: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Receiver of emitted listings
#[async_trait]
pub trait ListingSink: Send + Sync {
    /// Accepts one listing
    async fn push(&self, listing: &Listing) -> SinkResult<()>;

    /// Called once when the crawl run ends
    ///
    /// # Arguments
    ///
    /// * `report` - Final counters of the run
    async fn finish(&self, report: &CrawlReport) -> SinkResult<()> {
        let _ = report;
        Ok(())
    }
}
