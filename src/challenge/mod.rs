//! Anti-automation challenge handling
//!
//! This module contains:
//! - Detection of interstitial challenge pages by title, leading body text
//!   and challenge widget markers
//! - A bounded, fail-open wait-and-reinspect gate

mod detector;
mod gate;

pub use detector::{detect_challenge, is_challenge, ChallengeSignal, MARKERS, SIGNATURES};
pub use gate::{ChallengeGate, ChallengeOutcome, ChallengeState, Clearance};
