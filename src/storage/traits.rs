//! Storage traits and error types

use crate::extract::Listing;
use crate::state::CrawlReport;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence backend for crawl runs and the listings they emit
pub trait Storage: Send {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its id
    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the final status and counters of a run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()>;

    // ===== Listings =====

    /// Inserts a listing or refreshes the stored copy
    ///
    /// Returns true when the listing was not stored before.
    fn upsert_listing(&mut self, run_id: i64, listing: &Listing) -> StorageResult<bool>;

    fn count_listings(&self) -> StorageResult<u64>;

    fn count_listings_for_run(&self, run_id: i64) -> StorageResult<u64>;
}
