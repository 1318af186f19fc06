//! Listing-card extraction
//!
//! Cards are located with an ordered list of structural patterns; the first
//! pattern that matches at least one element is used for the whole page.
//! Each card is then read field by field through [`FieldLocators`].

use crate::extract::locator::{FieldLocators, Read};
use crate::extract::normalize::normalize_field;
use crate::extract::record::RawCardRecord;
use crate::url::resolve_href;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Why a single card was skipped
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("Invalid detail link {href:?}: {reason}")]
    InvalidLink { href: String, reason: String },
}

/// Selector layout of the catalog's listing cards
#[derive(Debug, Clone)]
pub struct CardLayout {
    card_patterns: Vec<Selector>,
    price: FieldLocators,
    address: FieldLocators,
    size: FieldLocators,
    rooms: FieldLocators,
    link: FieldLocators,
    image: FieldLocators,
    id_attributes: &'static [&'static str],
}

impl CardLayout {
    /// Layout for the current and previous generations of catalog markup
    pub fn standard() -> Self {
        let card_patterns = [
            "article",
            ".listing-card",
            r#"[class*="listing__card"]"#,
            ".property-card",
        ]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .collect();

        Self {
            card_patterns,
            price: FieldLocators::text(&[r#"[class*="price"]"#, ".price"]),
            address: FieldLocators::text(&[
                r#"[class*="address"]"#,
                r#"[class*="location"]"#,
                ".city",
            ]),
            size: FieldLocators::text(&[r#"[class*="area"]"#, r#"[class*="size"]"#, ".area"]),
            rooms: FieldLocators::text(&[r#"[class*="room"]"#]),
            link: FieldLocators::new(&[("a[href]", Read::Attr(&["href"]))]),
            image: FieldLocators::new(&[("img", Read::Attr(&["src", "data-src"]))]),
            id_attributes: &["data-listing-id", "data-id"],
        }
    }

    /// Finds card elements using the first pattern that matches anything
    pub fn locate_cards<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for pattern in &self.card_patterns {
            let cards: Vec<ElementRef<'a>> = document.select(pattern).collect();
            if !cards.is_empty() {
                return cards;
            }
        }
        Vec::new()
    }
}

impl Default for CardLayout {
    fn default() -> Self {
        Self::standard()
    }
}

/// Result of card extraction for one document
#[derive(Debug, Clone, Default)]
pub struct CardExtraction {
    /// Records with usable signal, in document order
    pub records: Vec<RawCardRecord>,

    /// Number of card elements matched
    pub cards_found: usize,

    /// Cards dropped because they carried no price, address or link
    pub noise: usize,

    /// Cards skipped because reading them failed
    pub errors: Vec<CardError>,
}

/// Extracts listing records from every card on the page
///
/// One bad card never aborts the page: its error is recorded and the
/// remaining cards are still read.
pub fn extract_cards(document: &Html, layout: &CardLayout, origin: &Url) -> CardExtraction {
    let cards = layout.locate_cards(document);
    let mut extraction = CardExtraction {
        cards_found: cards.len(),
        ..Default::default()
    };

    for card in cards {
        match extract_card(card, layout, origin) {
            Ok(Some(record)) => extraction.records.push(record),
            Ok(None) => extraction.noise += 1,
            Err(e) => {
                tracing::debug!("Skipping card: {}", e);
                extraction.errors.push(e);
            }
        }
    }

    extraction
}

/// Reads one card
///
/// # Returns
///
/// * `Ok(Some(record))` - The card carries a price, address or link
/// * `Ok(None)` - Decorative card without usable signal
/// * `Err(CardError)` - The card is malformed
pub fn extract_card(
    card: ElementRef<'_>,
    layout: &CardLayout,
    origin: &Url,
) -> Result<Option<RawCardRecord>, CardError> {
    let link = match layout.link.find(card) {
        Some(href) => resolve_href(&href, origin)
            .map_err(|e| CardError::InvalidLink {
                href: href.clone(),
                reason: e.to_string(),
            })?
            .map(|url| url.to_string()),
        None => None,
    };

    let image_url = layout
        .image
        .find(card)
        .and_then(|src| match resolve_href(&src, origin) {
            Ok(url) => url.map(|u| u.to_string()),
            Err(e) => {
                tracing::debug!("Ignoring card image {:?}: {}", src, e);
                None
            }
        });

    let listing_id = layout
        .id_attributes
        .iter()
        .find_map(|name| normalize_field(card.value().attr(name)))
        .or_else(|| link.as_deref().and_then(listing_id_from_link));

    let record = RawCardRecord {
        price: layout.price.find(card),
        address: layout.address.find(card),
        size: layout.size.find(card),
        rooms: layout.rooms.find(card),
        link,
        image_url,
        listing_id,
        link_is_fallback: false,
    };

    Ok(record.has_signal().then_some(record))
}

/// Takes the listing id from a detail link such as `https://ingatlan.com/34561234`
///
/// The last non-empty path segment is used when it is entirely numeric.
pub fn listing_id_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;

    if segment.chars().all(|c| c.is_ascii_digit()) {
        Some(segment.to_string())
    } else {
        None
    }
}
