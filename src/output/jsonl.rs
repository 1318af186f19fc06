//! JSON-lines file sink
//!
//! Every listing becomes one JSON object on its own line, appended to the
//! output file as soon as it is emitted.

use crate::extract::Listing;
use crate::output::traits::{ListingSink, SinkError, SinkResult};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Appends listings to a `.jsonl` file
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if needed
    pub fn open(path: &Path) -> SinkResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ListingSink for JsonLinesSink {
    async fn push(&self, listing: &Listing) -> SinkResult<()> {
        let line = serde_json::to_string(listing)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Write(format!("Failed to lock {}: {}", self.path.display(), e)))?;

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // Flush per record so a crashed run keeps everything emitted so far
        writer.flush()?;
        Ok(())
    }
}
