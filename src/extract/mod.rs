//! Extraction module for turning catalog pages into listing records
//!
//! This module contains:
//! - Text normalization shared by all fields
//! - Ordered field locators
//! - Card-level extraction with per-card error isolation
//! - The JSON-LD fallback used when no cards are found

mod cards;
mod locator;
mod normalize;
mod record;
mod structured;

pub use cards::{extract_card, extract_cards, listing_id_from_link, CardError, CardExtraction, CardLayout};
pub use locator::{FieldLocator, FieldLocators, Read};
pub use normalize::{normalize_field, normalize_text};
pub use record::{parse_number, DedupKey, Listing, RawCardRecord};
pub use structured::extract_structured;

use scraper::Html;
use url::Url;

/// Which extractor produced a page's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Listing cards in the visual markup
    Cards,
    /// Embedded JSON-LD metadata
    Structured,
    /// Neither produced anything
    Empty,
}

/// Records extracted from one page
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub records: Vec<RawCardRecord>,
    pub source: ExtractionSource,
    /// Cards skipped because reading them failed
    pub card_errors: usize,
}

/// Extracts records from a parsed page
///
/// Card extraction runs first. The JSON-LD fallback only runs when cards
/// produced no records, and its results are never mixed with card results.
pub fn extract_page(
    document: &Html,
    layout: &CardLayout,
    origin: &Url,
    page_url: &str,
) -> PageExtraction {
    let cards = extract_cards(document, layout, origin);
    let card_errors = cards.errors.len();

    if !cards.records.is_empty() {
        return PageExtraction {
            records: cards.records,
            source: ExtractionSource::Cards,
            card_errors,
        };
    }

    let records = extract_structured(document, page_url);
    let source = if records.is_empty() {
        ExtractionSource::Empty
    } else {
        tracing::debug!(
            "No listing cards on {}, using {} JSON-LD records",
            page_url,
            records.len()
        );
        ExtractionSource::Structured
    };

    PageExtraction {
        records,
        source,
        card_errors,
    }
}
