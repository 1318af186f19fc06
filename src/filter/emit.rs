//! Filter, deduplicate and emit
//!
//! Records flow through normalization, the numeric filter and the run's
//! seen-set before being pushed to the sink one at a time. A failed push is
//! logged and counted; it never stops the remaining records, and the listing
//! is not marked as seen.

use crate::extract::{Listing, RawCardRecord};
use crate::filter::criteria::FilterCriteria;
use crate::output::ListingSink;
use crate::state::CrawlState;
use chrono::Utc;

/// Crawl-time context attached to every listing from one page
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub criteria: &'a FilterCriteria,
    /// Catalog page the records came from
    pub source_url: &'a str,
}

/// Per-page outcome of [`process`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub emitted: usize,
    pub filtered_out: usize,
    pub duplicates: usize,
    pub sink_failures: usize,
}

/// Filters, deduplicates and emits one page worth of records
///
/// Updates the counters in `state` and returns what happened on this page.
pub async fn process(
    records: Vec<RawCardRecord>,
    ctx: EmitContext<'_>,
    state: &mut CrawlState,
    sink: &dyn ListingSink,
) -> EmitSummary {
    let mut summary = EmitSummary::default();

    for raw in records {
        let listing = Listing::from_raw(&raw, ctx.source_url, Utc::now());

        if let Err(rejection) = ctx.criteria.check(listing.price_value, listing.size_value) {
            tracing::debug!(
                "Filtered out {:?} ({}): {}",
                listing.price,
                listing.address,
                rejection
            );
            summary.filtered_out += 1;
            state.filtered_out += 1;
            continue;
        }

        let key = raw.dedup_key();
        if let Some(key) = &key {
            if state.has_seen_listing(key) {
                tracing::debug!("Dropping duplicate listing {:?}", key);
                summary.duplicates += 1;
                state.duplicates += 1;
                continue;
            }
        }

        // Only accepted listings count as seen, so a later copy of a
        // rejected one gets another chance.
        match sink.push(&listing).await {
            Ok(()) => {
                if let Some(key) = &key {
                    state.mark_listing_seen(key);
                }
                summary.emitted += 1;
                state.total_emitted += 1;
            }
            Err(e) => {
                tracing::warn!("Sink rejected listing {}: {}", listing.key(), e);
                summary.sink_failures += 1;
                state.sink_failures += 1;
            }
        }
    }

    summary
}
