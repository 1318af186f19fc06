//! Suspension capability used for challenge waits, retry spacing and pacing

use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

/// Something that can suspend the crawl for a while
#[async_trait]
pub trait Waiter: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer, adding uniform random jitter to every wait
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioWaiter {
    jitter: Duration,
}

impl TokioWaiter {
    pub fn new(jitter: Duration) -> Self {
        Self { jitter }
    }

    /// Picks the actual duration for a requested wait
    fn jittered(&self, duration: Duration) -> Duration {
        if self.jitter.is_zero() {
            return duration;
        }
        let max = self.jitter.as_millis().min(u64::MAX as u128) as u64;
        let extra = rand::thread_rng().gen_range(0..=max);
        duration + Duration::from_millis(extra)
    }
}

#[async_trait]
impl Waiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        // A zero wait means the delay is switched off; jitter is not added.
        if duration.is_zero() {
            return;
        }
        let actual = self.jittered(duration);
        tracing::trace!("Waiting {:?}", actual);
        tokio::time::sleep(actual).await;
    }
}

/// Records requested waits without sleeping
#[derive(Debug, Default)]
pub struct RecordingWaiter {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.waits().len()
    }
}

#[async_trait]
impl Waiter for RecordingWaiter {
    async fn wait(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}
