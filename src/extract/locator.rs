//! Ordered field locators
//!
//! Listing markup drifts between site releases, so every field is read
//! through an explicit ordered list of candidate selectors. The first
//! candidate that produces a non-blank value wins.

use crate::extract::normalize::normalize_field;
use scraper::{ElementRef, Selector};

/// What to read from a matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// The element's concatenated text content
    Text,
    /// The first present, non-blank attribute out of the list
    Attr(&'static [&'static str]),
}

/// One candidate selector for a field
#[derive(Debug, Clone)]
pub struct FieldLocator {
    selector: Selector,
    read: Read,
}

impl FieldLocator {
    /// Compiles a locator, returning `None` for an invalid selector
    pub fn new(css: &str, read: Read) -> Option<Self> {
        match Selector::parse(css) {
            Ok(selector) => Some(Self { selector, read }),
            Err(e) => {
                tracing::warn!("Ignoring invalid selector {:?}: {:?}", css, e);
                None
            }
        }
    }

    /// Reads the first non-blank value this locator finds inside `scope`
    pub fn locate(&self, scope: ElementRef<'_>) -> Option<String> {
        scope
            .select(&self.selector)
            .find_map(|element| read_value(element, self.read))
    }
}

/// Ordered candidates for a single field
#[derive(Debug, Clone)]
pub struct FieldLocators {
    locators: Vec<FieldLocator>,
}

impl FieldLocators {
    pub fn new(candidates: &[(&str, Read)]) -> Self {
        Self {
            locators: candidates
                .iter()
                .filter_map(|(css, read)| FieldLocator::new(css, *read))
                .collect(),
        }
    }

    /// Text field shorthand
    pub fn text(candidates: &[&str]) -> Self {
        let candidates: Vec<(&str, Read)> = candidates.iter().map(|css| (*css, Read::Text)).collect();
        Self::new(&candidates)
    }

    /// Returns the value of the first locator that matches
    pub fn find(&self, scope: ElementRef<'_>) -> Option<String> {
        self.locators.iter().find_map(|locator| locator.locate(scope))
    }
}

/// Reads a value from an element itself
pub fn read_value(element: ElementRef<'_>, read: Read) -> Option<String> {
    match read {
        Read::Text => normalize_field(Some(&element.text().collect::<String>())),
        Read::Attr(names) => names
            .iter()
            .find_map(|name| normalize_field(element.value().attr(name))),
    }
}
