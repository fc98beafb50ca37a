//! Single-shot delayed re-check
//!
//! Schedules exactly one follow-up query after a fixed delay. The delay is an
//! async timer, so the task yields to other analyses while it waits. The
//! primitive is consumed by `run`, which bounds it to one attempt.

use std::future::Future;
use std::time::Duration;

/// One delayed attempt, consumed on use.
#[derive(Debug)]
pub struct DelayedRecheck {
    delay: Duration,
}

impl DelayedRecheck {
    pub fn after(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait out the delay, then run `check` once.
    pub async fn run<F, Fut, T>(self, check: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        check().await
    }
}
