//! JSON-LD fallback extraction
//!
//! When no listing cards are found, the catalog's embedded
//! `<script type="application/ld+json">` blocks are scanned instead. Each
//! block may hold a single object, an array, an `@graph` or an `ItemList`;
//! all of them are flattened into candidate items.

use crate::extract::record::RawCardRecord;
use scraper::{Html, Selector};
use serde_json::Value;

const LISTING_TYPE: &str = "RealEstateListing";

/// Extracts records from the page's JSON-LD blocks
///
/// A block that fails to parse is logged and skipped; the scan always
/// continues with the next block.
pub fn extract_structured(document: &Html, page_url: &str) -> Vec<RawCardRecord> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut records = Vec::new();

    for (index, script) in document.select(&selector).enumerate() {
        let text = script.text().collect::<String>();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let json: Value = match serde_json::from_str(text) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!("Skipping JSON-LD block {} on {}: {}", index, page_url, e);
                continue;
            }
        };

        let mut items = Vec::new();
        collect_items(&json, &mut items);

        records.extend(
            items
                .into_iter()
                .filter(|item| is_listing(item))
                .map(|item| map_item(item, page_url)),
        );
    }

    records
}

/// Flattens arrays, `@graph` containers and `ItemList` elements
fn collect_items<'a>(value: &'a Value, items: &mut Vec<&'a Value>) {
    match value {
        Value::Array(values) => {
            for v in values {
                collect_items(v, items);
            }
        }
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect_items(graph, items);
            }

            if has_type(value, "ItemList") {
                if let Some(Value::Array(elements)) = map.get("itemListElement") {
                    for element in elements {
                        collect_items(element.get("item").unwrap_or(element), items);
                    }
                }
                return;
            }

            if !map.contains_key("@graph") {
                items.push(value);
            }
        }
        _ => {}
    }
}

/// `@type` may be a string or a list of strings
fn has_type(item: &Value, wanted: &str) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn is_listing(item: &Value) -> bool {
    has_type(item, LISTING_TYPE) || item.get("name").and_then(scalar).is_some()
}

fn map_item(item: &Value, page_url: &str) -> RawCardRecord {
    let price = item
        .get("price")
        .and_then(scalar)
        .or_else(|| item.get("offers").and_then(offer_price));

    let address = match item.get("address") {
        Some(Value::Object(_)) => item.pointer("/address/streetAddress").and_then(scalar),
        Some(other) => scalar(other),
        None => None,
    }
    .or_else(|| item.get("name").and_then(scalar));

    let link = item.get("url").and_then(scalar);
    let link_is_fallback = link.is_none();

    RawCardRecord {
        price,
        address,
        size: item.pointer("/floorSize/value").and_then(scalar),
        rooms: item.get("numberOfRooms").and_then(scalar),
        link: link.or_else(|| Some(page_url.to_string())),
        image_url: item.get("image").and_then(image_url),
        listing_id: item.get("identifier").and_then(identifier),
        link_is_fallback,
    }
}

/// `offers` may be a single offer or a list of them
fn offer_price(offers: &Value) -> Option<String> {
    match offers {
        Value::Array(list) => list.iter().find_map(offer_price),
        _ => offers.get("price").and_then(scalar),
    }
}

fn image_url(image: &Value) -> Option<String> {
    match image {
        Value::Array(list) => list.iter().find_map(image_url),
        Value::Object(_) => image.get("url").and_then(scalar),
        other => scalar(other),
    }
}

fn identifier(id: &Value) -> Option<String> {
    match id {
        Value::Object(_) => id.get("value").and_then(scalar),
        other => scalar(other),
    }
}

/// Renders strings and numbers as text; blanks and other shapes are ignored
fn scalar(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
