use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum gap between successive network requests.
///
/// One limiter instance is shared by everything that talks to feed hosts
/// in a run. It is owned state handed to the client, not a process global,
/// so tests and parallel runs construct isolated instances.
///
/// `acquire` holds the internal lock across its sleep on purpose: a second
/// caller arriving mid-wait queues behind the first and measures its gap
/// from the first caller's request time, which keeps successive requests
/// at least `min_gap` apart no matter how many tasks share the limiter.
#[derive(Debug)]
pub struct RateLimiter {
    min_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until `min_gap` has elapsed since the previous acquisition,
    /// then records the current time as the new last-request mark.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_gap {
                tokio::time::sleep(self.min_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
