//! Output module for emitting listings and reporting runs
//!
//! This module handles:
//! - The `ListingSink` interface the crawler emits into
//! - JSON-lines, SQLite and in-memory sinks
//! - End-of-run reports and stored statistics

mod jsonl;
mod memory;
mod sqlite_output;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
pub use sqlite_output::SqliteSink;
pub use stats::{format_report, print_report, print_statistics};
pub use traits::{ListingSink, SinkError, SinkResult};

use crate::config::{OutputConfig, OutputFormat};
use crate::storage::{SqliteStorage, Storage};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Builds the sink selected by the `[output]` table
///
/// # Arguments
///
/// * `config` - The output configuration
/// * `seed_url` - Seed of the run, recorded with SQLite runs
/// * `config_hash` - Hash of the configuration file, recorded with SQLite runs
pub fn open_sink(
    config: &OutputConfig,
    seed_url: &str,
    config_hash: &str,
) -> SinkResult<Box<dyn ListingSink>> {
    let path = Path::new(&config.path);

    match config.format {
        OutputFormat::Jsonl => Ok(Box::new(JsonLinesSink::open(path)?)),
        OutputFormat::Sqlite => {
            let storage: Arc<Mutex<dyn Storage>> =
                Arc::new(Mutex::new(SqliteStorage::new(path)?));
            Ok(Box::new(SqliteSink::start_run(storage, seed_url, config_hash)?))
        }
    }
}
