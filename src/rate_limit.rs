//! Minimum-spacing rate limiter for outbound calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Enforces a minimum interval between permitted calls.
///
/// All holders of one instance share the same clock: a call to [`wait`](Self::wait)
/// returns no earlier than `interval` after the previous permitted call, no
/// matter which task made it. Waiters are serialized but not queued in FIFO order.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Wait until the next call is permitted.
    pub async fn wait(&self) {
        if !self.is_enabled() {
            return;
        }

        // Holding the lock across the sleep is what serializes callers.
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.interval;
            let now = Instant::now();
            if ready_at > now {
                trace!("Rate limited for {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
