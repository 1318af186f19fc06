//! SQLite-backed listing sink
//!
//! This sink records each emitted listing directly into the storage
//! backend, under the run that was opened when the sink was created.

use crate::extract::Listing;
use crate::output::traits::{ListingSink, SinkError, SinkResult};
use crate::state::CrawlReport;
use crate::storage::{RunStatus, Storage, StorageError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// SQLite-based output sink
pub struct SqliteSink {
    storage: Arc<Mutex<dyn Storage>>,
    run_id: i64,
}

impl SqliteSink {
    /// Opens a new run in `storage` and returns a sink bound to it
    pub fn start_run(
        storage: Arc<Mutex<dyn Storage>>,
        seed_url: &str,
        config_hash: &str,
    ) -> SinkResult<Self> {
        let run_id = storage
            .lock()
            .map_err(|_| StorageError::Poisoned)?
            .create_run(seed_url, config_hash)?;

        tracing::info!("Recording listings under run {}", run_id);
        Ok(Self { storage, run_id })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

#[async_trait]
impl ListingSink for SqliteSink {
    async fn push(&self, listing: &Listing) -> SinkResult<()> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| SinkError::Write(format!("Failed to lock storage: {}", e)))?;

        if !storage.upsert_listing(self.run_id, listing)? {
            tracing::debug!("Refreshed previously stored listing {}", listing.key());
        }
        Ok(())
    }

    async fn finish(&self, report: &CrawlReport) -> SinkResult<()> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| SinkError::Write(format!("Failed to lock storage: {}", e)))?;

        storage.finish_run(self.run_id, RunStatus::Completed, report)?;
        Ok(())
    }
}
