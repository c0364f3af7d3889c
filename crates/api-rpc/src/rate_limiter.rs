//! Rate Limiter (Token Bucket Algorithm)
//!
//! Caps mutating RPC traffic. One shared bucket behind an async mutex;
//! contention at these request rates is negligible.

use std::time::Instant;
use tokio::sync::Mutex;

/// Token-bucket rate limiter
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    max_tokens: f64,
    refill_per_sec: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// `max_tokens` is the burst size, `refill_per_sec` the sustained rate.
    /// `RateLimiter::new(200, 100)` allows 100 req/sec with bursts of 200.
    pub fn new(max_tokens: u32, refill_per_sec: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: max_tokens as f64,
                last_refill: Instant::now(),
            }),
            max_tokens: max_tokens as f64,
            refill_per_sec: refill_per_sec as f64,
        }
    }

    /// Consume one token. Returns false when the bucket is empty.
    pub async fn check(&self) -> bool {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remaining tokens (monitoring)
    pub async fn remaining(&self) -> f64 {
        self.bucket.lock().await.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn allows_burst_then_denies() {
        let limiter = RateLimiter::new(10, 10);

        for _ in 0..10 {
            assert!(limiter.check().await);
        }
        assert!(!limiter.check().await);
    }

    #[tokio::test]
    async fn refills_over_time() {
        let limiter = RateLimiter::new(5, 10); // 10 tokens/sec

        for _ in 0..5 {
            assert!(limiter.check().await);
        }
        assert!(!limiter.check().await);

        sleep(Duration::from_secs(1)).await;
        assert!(limiter.check().await);
    }

    #[tokio::test]
    async fn concurrent_callers_never_exceed_burst() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(100, 50));

        let mut handles = vec![];
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                let mut allowed = 0;
                for _ in 0..20 {
                    if limiter.check().await {
                        allowed += 1;
                    }
                }
                allowed
            }));
        }

        let mut total_allowed = 0;
        for handle in handles {
            total_allowed += handle.await.unwrap();
        }

        // 200 attempts against a burst of 100 (plus a sliver of refill)
        assert!(
            total_allowed <= 105,
            "Expected at most ~100 allowed, got {}",
            total_allowed
        );
        assert!(
            total_allowed >= 90,
            "Expected at least 90 allowed, got {}",
            total_allowed
        );
    }
}
