//! Bounded wait-and-reinspect loop for challenge pages
//!
//! The gate never fails a page: when the challenge does not clear within
//! the allowed number of waits, or a re-inspection breaks, the last
//! document seen is handed on to extraction.

use crate::challenge::detector::detect_challenge;
use crate::config::CrawlerConfig;
use crate::crawler::{FetchedPage, PageSource, Waiter};
use std::time::Duration;

/// How a page left the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    /// The page was, or became, a regular page
    NoChallenge,
    /// Waits ran out or re-inspection failed; proceeding with the last document
    Exhausted,
}

/// Position of a page in the challenge loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Unchecked,
    /// Still challenged after the given number of waits
    Challenged(u32),
    Cleared(Clearance),
}

/// Result of passing a page through the gate
#[derive(Debug, Clone)]
pub struct ChallengeOutcome {
    /// Last document seen
    pub page: FetchedPage,
    /// Waits performed
    pub waits: u32,
    pub clearance: Clearance,
}

/// Challenge detector plus bounded backoff
#[derive(Debug, Clone, Copy)]
pub struct ChallengeGate {
    max_waits: u32,
    wait: Duration,
}

impl ChallengeGate {
    pub fn new(max_waits: u32, wait: Duration) -> Self {
        Self { max_waits, wait }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_challenge_waits, config.challenge_wait())
    }

    /// Waits out a challenge on `page`, re-inspecting through `source`
    pub async fn clear(
        &self,
        page: FetchedPage,
        source: &dyn PageSource,
        waiter: &dyn Waiter,
    ) -> ChallengeOutcome {
        let mut page = page;
        let mut state = ChallengeState::Unchecked;
        let mut waits = 0;

        loop {
            state = match state {
                ChallengeState::Unchecked => self.inspect(&page, 0),

                ChallengeState::Challenged(n) if n >= self.max_waits => {
                    tracing::warn!(
                        "Challenge on {} did not clear after {} waits, proceeding anyway",
                        page.url,
                        n
                    );
                    ChallengeState::Cleared(Clearance::Exhausted)
                }

                ChallengeState::Challenged(n) => {
                    waiter.wait(self.wait).await;
                    waits += 1;

                    match source.reinspect(&page).await {
                        Ok(fresh) => {
                            page = fresh;
                            self.inspect(&page, n + 1)
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Re-inspecting {} failed, proceeding with last document: {}",
                                page.url,
                                e
                            );
                            ChallengeState::Cleared(Clearance::Exhausted)
                        }
                    }
                }

                ChallengeState::Cleared(clearance) => {
                    if waits > 0 && clearance == Clearance::NoChallenge {
                        tracing::info!("Challenge on {} cleared after {} waits", page.url, waits);
                    }
                    return ChallengeOutcome {
                        page,
                        waits,
                        clearance,
                    };
                }
            };
        }
    }

    fn inspect(&self, page: &FetchedPage, waits: u32) -> ChallengeState {
        match detect_challenge(&page.body) {
            Some(signal) => {
                tracing::debug!("Challenge detected on {} ({:?})", page.url, signal);
                ChallengeState::Challenged(waits)
            }
            None => ChallengeState::Cleared(Clearance::NoChallenge),
        }
    }
}
