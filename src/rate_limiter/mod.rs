use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Keeps outbound webhook posts at least `interval` apart.
pub struct RateLimiter {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            last_request: None,
        }
    }

    /// Waits until the interval since the previous request has passed.
    /// The first request after `new` or `reset` goes out immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            sleep_until(last + self.interval).await;
        }
        self.last_request = Some(Instant::now());
    }

    pub fn reset(&mut self) {
        self.last_request = None;
    }
}
