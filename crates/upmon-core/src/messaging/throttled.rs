use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{messaging::port::NotificationSink, Result};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between sends through one sink.
    pub min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // Telegram allows roughly one message per second per chat.
        Self {
            min_interval: Duration::from_millis(1050),
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// NotificationSink decorator that spaces outbound sends.
///
/// Reservations are taken in call order, so queued messages keep their order.
pub struct ThrottledSink {
    inner: Arc<dyn NotificationSink>,
    limiter: Mutex<IntervalLimiter>,
}

impl ThrottledSink {
    pub fn new(inner: Arc<dyn NotificationSink>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            limiter: Mutex::new(IntervalLimiter::new(cfg.min_interval)),
        }
    }
}

#[async_trait]
impl NotificationSink for ThrottledSink {
    async fn send(&self, text: &str) -> Result<()> {
        let wait = { self.limiter.lock().await.reserve() };
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
        self.inner.send(text).await
    }
}
