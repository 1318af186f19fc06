//! Listing record shapes
//!
//! A [`RawCardRecord`] is what extraction produces for one card or JSON-LD
//! item; a [`Listing`] is the normalized, timestamped record handed to a sink.

use crate::extract::normalize::{normalize_field, normalize_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fields read from one listing card, before any cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCardRecord {
    pub price: Option<String>,
    pub address: Option<String>,
    pub size: Option<String>,
    pub rooms: Option<String>,
    pub link: Option<String>,
    pub image_url: Option<String>,
    pub listing_id: Option<String>,

    /// The link is the page the record was found on, not a detail page
    pub link_is_fallback: bool,
}

impl RawCardRecord {
    /// Returns true if the record carries a price, an address or a link
    ///
    /// Records without any of the three are decorative noise (promo tiles,
    /// banner images) and are never emitted.
    pub fn has_signal(&self) -> bool {
        [&self.price, &self.address, &self.link]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Key used for duplicate detection: the listing id, else the link
    ///
    /// A fallback link is shared by every record on its page, so it never
    /// identifies one listing.
    pub fn dedup_key(&self) -> Option<DedupKey> {
        if let Some(id) = normalize_field(self.listing_id.as_deref()) {
            return Some(DedupKey::ListingId(id));
        }
        if self.link_is_fallback {
            return None;
        }
        normalize_field(self.link.as_deref()).map(DedupKey::Link)
    }
}

/// Identity of a record within one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    ListingId(String),
    Link(String),
}

/// A normalized listing as emitted to the output sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub listing_id: Option<String>,
    pub price: String,
    pub address: String,
    pub size: String,
    pub rooms: String,
    pub link: String,
    pub image_url: String,

    /// Digits of the price text, if any
    pub price_value: Option<u64>,

    /// Digits of the size text, if any
    pub size_value: Option<u64>,

    pub scraped_at: DateTime<Utc>,

    /// Catalog page the listing was found on
    pub source_url: String,

    #[serde(skip)]
    pub link_is_fallback: bool,
}

impl Listing {
    /// Builds a listing from a raw record plus crawl-time context
    pub fn from_raw(raw: &RawCardRecord, source_url: &str, scraped_at: DateTime<Utc>) -> Self {
        let price = normalize_text(raw.price.as_deref());
        let size = normalize_text(raw.size.as_deref());

        Self {
            listing_id: normalize_field(raw.listing_id.as_deref()),
            price_value: parse_number(&price),
            size_value: parse_number(&size),
            price,
            address: normalize_text(raw.address.as_deref()),
            size,
            rooms: normalize_text(raw.rooms.as_deref()),
            link: normalize_text(raw.link.as_deref()),
            image_url: normalize_text(raw.image_url.as_deref()),
            scraped_at,
            source_url: source_url.to_string(),
            link_is_fallback: raw.link_is_fallback,
        }
    }

    /// Storage key: listing id when known, else the detail link
    ///
    /// Listings with neither are keyed by a hash of their visible fields and
    /// the page they came from.
    pub fn key(&self) -> String {
        if let Some(id) = &self.listing_id {
            return id.clone();
        }
        if !self.link_is_fallback && !self.link.is_empty() {
            return self.link.clone();
        }
        self.content_key()
    }

    fn content_key(&self) -> String {
        let mut hasher = Sha256::new();
        for field in [&self.price, &self.address, &self.size, &self.rooms, &self.source_url] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }
}

/// Parses a number out of display text by keeping only its digits
///
/// `"85 900 000 Ft"` gives `85900000`; text without digits (for example
/// `"Ár megegyezés szerint"`) gives `None`. Overflowing values are treated
/// as unparseable.
pub fn parse_number(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
