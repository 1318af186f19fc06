//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::extract::Listing;
use crate::state::CrawlReport;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, seed_url, config_hash, started_at, finished_at, status, \
                           pages_processed, total_emitted, failed_requests";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        config_hash: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
        pages_processed: row.get::<_, i64>(6)? as u32,
        total_emitted: row.get::<_, i64>(7)? as u64,
        failed_requests: row.get::<_, i64>(8)? as u32,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, seed_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed_url, config_hash, started_at, status) VALUES (?1, ?2, ?3, ?4)",
            params![seed_url, config_hash, now, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        report: &CrawlReport,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs
             SET status = ?1, finished_at = ?2, pages_processed = ?3,
                 total_emitted = ?4, failed_requests = ?5
             WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                report.pages_processed as i64,
                report.total_emitted as i64,
                report.failed_requests as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Listings =====

    fn upsert_listing(&mut self, run_id: i64, listing: &Listing) -> StorageResult<bool> {
        let key = listing.key();
        let existed: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM listings WHERE listing_key = ?1",
                params![key],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        let scraped_at = listing.scraped_at.to_rfc3339();
        self.conn.execute(
            "INSERT INTO listings (
                listing_key, listing_id, price, price_value, address, size, size_value,
                rooms, link, image_url, source_url, first_seen_at, scraped_at, run_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, ?13)
             ON CONFLICT(listing_key) DO UPDATE SET
                price = excluded.price,
                price_value = excluded.price_value,
                address = excluded.address,
                size = excluded.size,
                size_value = excluded.size_value,
                rooms = excluded.rooms,
                image_url = excluded.image_url,
                source_url = excluded.source_url,
                scraped_at = excluded.scraped_at,
                run_id = excluded.run_id",
            params![
                key,
                listing.listing_id,
                listing.price,
                listing.price_value.and_then(|v| i64::try_from(v).ok()),
                listing.address,
                listing.size,
                listing.size_value.and_then(|v| i64::try_from(v).ok()),
                listing.rooms,
                listing.link,
                listing.image_url,
                listing.source_url,
                scraped_at,
                run_id
            ],
        )?;

        Ok(!existed)
    }

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_listings_for_run(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM listings WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
