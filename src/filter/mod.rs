//! Filtering and emission of extracted records
//!
//! This module contains the numeric range predicates applied to every
//! record and the emit step that deduplicates survivors and forwards them
//! to the output sink.

mod criteria;
mod emit;

pub use criteria::{FilterCriteria, Rejection};
pub use emit::{process, EmitContext, EmitSummary};
