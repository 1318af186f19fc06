//! In-memory sink, used for dry runs and tests

use crate::extract::Listing;
use crate::output::traits::{ListingSink, SinkError, SinkResult};
use async_trait::async_trait;
use std::sync::Mutex;

/// Collects listings in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    listings: Mutex<Vec<Listing>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything pushed so far
    pub fn listings(&self) -> Vec<Listing> {
        self.listings
            .lock()
            .map(|listings| listings.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.listings.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ListingSink for MemorySink {
    async fn push(&self, listing: &Listing) -> SinkResult<()> {
        self.listings
            .lock()
            .map_err(|e| SinkError::Write(format!("Failed to lock sink: {}", e)))?
            .push(listing.clone());
        Ok(())
    }
}
