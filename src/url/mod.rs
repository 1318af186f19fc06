//! URL handling module for Listing-Ripple
//!
//! This module provides request-identity normalization, resolution of
//! scheme-less card links against the site origin, and the page-number
//! query rewriting used for derived pagination.

mod normalize;
mod resolve;

pub use normalize::{normalize_url, url_key};
pub use resolve::{resolve_href, with_page_param, PAGE_PARAM};
