//! Fixed-interval gate for outbound E-utilities calls.
//!
//! NCBI allows roughly 3 requests/second without an API key. One limiter is
//! shared by every request the server handles, so concurrent callers are
//! spaced out together rather than each on their own clock.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Interval that keeps us under 3 requests/second.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(340);

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next slot is free and claim it.
    ///
    /// Slots are handed out in the order callers reach the lock, each one
    /// `interval` after the previous.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            trace!(wait_ms = wait.as_millis() as u64, "Rate limiter waiting");
            tokio::time::sleep_until(slot).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
