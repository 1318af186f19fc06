//! Numeric range predicates

use serde::Serialize;
use std::fmt;

/// Optional inclusive bounds on price and size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

/// Why a record failed the criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A price bound is active but the price text holds no number
    PriceUnparseable,
    PriceBelow(u64),
    PriceAbove(u64),
    SizeBelow(u64),
    SizeAbove(u64),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceUnparseable => write!(f, "price is not a number"),
            Self::PriceBelow(min) => write!(f, "price below {}", min),
            Self::PriceAbove(max) => write!(f, "price above {}", max),
            Self::SizeBelow(min) => write!(f, "size below {}", min),
            Self::SizeAbove(max) => write!(f, "size above {}", max),
        }
    }
}

impl FilterCriteria {
    pub fn has_price_bounds(&self) -> bool {
        self.min_price.is_some() || self.max_price.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_price_bounds() && self.min_size.is_none() && self.max_size.is_none()
    }

    /// Checks parsed price and size values against the active bounds
    ///
    /// A missing price fails any active price bound. Size bounds only apply
    /// when a size could be parsed: plenty of cards omit the floor area and
    /// they are not rejected for it.
    pub fn check(&self, price: Option<u64>, size: Option<u64>) -> Result<(), Rejection> {
        if self.has_price_bounds() {
            let price = price.ok_or(Rejection::PriceUnparseable)?;
            if let Some(min) = self.min_price.filter(|min| price < *min) {
                return Err(Rejection::PriceBelow(min));
            }
            if let Some(max) = self.max_price.filter(|max| price > *max) {
                return Err(Rejection::PriceAbove(max));
            }
        }

        if let Some(size) = size {
            if let Some(min) = self.min_size.filter(|min| size < *min) {
                return Err(Rejection::SizeBelow(min));
            }
            if let Some(max) = self.max_size.filter(|max| size > *max) {
                return Err(Rejection::SizeAbove(max));
            }
        }

        Ok(())
    }
}
