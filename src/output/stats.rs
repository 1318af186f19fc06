//! Human-readable run reports
//!
//! This module formats the end-of-run report and the statistics stored in
//! a SQLite output database.

use crate::state::CrawlReport;
use crate::storage::{Storage, StorageResult};

/// Formats a crawl report for the terminal
pub fn format_report(report: &CrawlReport) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Report ===\n\n");
    out.push_str(&format!("  Pages processed:  {}\n", report.pages_processed));
    out.push_str(&format!("  Listings emitted: {}\n", report.total_emitted));
    out.push_str(&format!("  Filtered out:     {}\n", report.filtered_out));
    out.push_str(&format!("  Duplicates:       {}\n", report.duplicates));

    if report.card_errors > 0 {
        out.push_str(&format!("  Unreadable cards: {}\n", report.card_errors));
    }
    if report.sink_failures > 0 {
        out.push_str(&format!("  Sink failures:    {}\n", report.sink_failures));
    }
    if report.failed_requests > 0 {
        out.push_str(&format!("  Failed requests:  {}\n", report.failed_requests));
    }

    out
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Prints the statistics stored in an output database
pub fn print_statistics(storage: &dyn Storage) -> StorageResult<()> {
    println!("=== Listing Statistics ===\n");
    println!("  Stored listings: {}", storage.count_listings()?);

    match storage.get_latest_run()? {
        Some(run) => {
            println!("\nLatest run ({}):", run.id);
            println!("  Seed:      {}", run.seed_url);
            println!("  Started:   {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished:  {}", finished);
            }
            println!("  Status:    {}", run.status.to_db_string());
            println!("  Pages:     {}", run.pages_processed);
            println!("  Emitted:   {}", run.total_emitted);
            println!(
                "  New/seen:  {}",
                storage.count_listings_for_run(run.id)?
            );
            println!("  Failed:    {}", run.failed_requests);
        }
        None => println!("\nNo crawl runs recorded yet."),
    }

    Ok(())
}
