//! Shared request gate for one source's symbol workers.
//!
//! Token bucket refilled continuously at `rate` tokens per second with a
//! burst capacity of `max(1, rate)`. Every candle and listing request takes
//! one token.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Clone)]
pub struct RequestGate {
    inner: Option<Arc<Mutex<Bucket>>>,
}

struct Bucket {
    tokens: f64,
    capacity: f64,
    rate: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }
}

impl RequestGate {
    /// A non-positive or non-finite rate disables gating.
    pub fn new(requests_per_second: f64) -> Self {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Self::unlimited();
        }
        let capacity = requests_per_second.max(1.0);
        Self {
            inner: Some(Arc::new(Mutex::new(Bucket {
                tokens: capacity,
                capacity,
                rate: requests_per_second,
                last_refill: Instant::now(),
            }))),
        }
    }

    pub fn unlimited() -> Self {
        Self { inner: None }
    }

    pub fn is_limited(&self) -> bool {
        self.inner.is_some()
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        let Some(inner) = &self.inner else {
            return;
        };

        loop {
            let wait = {
                let mut bucket = inner.lock().await;
                bucket.refill(Instant::now());

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                let deficit = 1.0 - bucket.tokens;
                Duration::from_secs_f64(deficit / bucket.rate)
            };

            tracing::trace!(wait_ms = wait.as_millis() as u64, "request gate saturated");
            tokio::time::sleep(wait).await;
        }
    }
}
