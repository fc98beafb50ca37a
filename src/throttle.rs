//! Outbound request throttling
//!
//! Bounds the number of requests in flight against one upstream and keeps a
//! minimum spacing between request starts. Requests are throttled, not
//! serialized: any number of callers may wait, and up to `max_in_flight`
//! proceed at once.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Shared throttle for one upstream endpoint.
#[derive(Clone)]
pub struct Throttle {
    permits: Arc<Semaphore>,
    min_interval: Duration,
    next_start: Arc<Mutex<Instant>>,
}

impl Throttle {
    /// Create a throttle allowing `max_in_flight` concurrent requests, started
    /// at least `min_interval` apart.
    pub fn new(max_in_flight: usize, min_interval: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            min_interval,
            next_start: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Throttle without spacing, bounded only by in-flight count.
    pub fn unspaced(max_in_flight: usize) -> Self {
        Self::new(max_in_flight, Duration::ZERO)
    }

    /// Wait for a request slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("Request throttle closed")?;

        if !self.min_interval.is_zero() {
            let wait_until = {
                let mut next = self.next_start.lock().await;
                let now = Instant::now();
                let start = (*next).max(now);
                *next = start + self.min_interval;
                start
            };
            tokio::time::sleep_until(wait_until).await;
        }

        Ok(permit)
    }

    /// Number of requests that could start right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_flight_bound() {
        let throttle = Throttle::unspaced(2);
        let a = throttle.acquire().await.unwrap();
        let _b = throttle.acquire().await.unwrap();
        assert_eq!(throttle.available(), 0);
        drop(a);
        assert_eq!(throttle.available(), 1);
    }

    #[tokio::test]
    async fn test_spacing_between_starts() {
        let throttle = Throttle::new(4, Duration::from_millis(20));
        let started = Instant::now();
        let _a = throttle.acquire().await.unwrap();
        let _b = throttle.acquire().await.unwrap();
        let _c = throttle.acquire().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_zero_in_flight_is_clamped() {
        let throttle = Throttle::unspaced(0);
        assert_eq!(throttle.available(), 1);
    }
}
