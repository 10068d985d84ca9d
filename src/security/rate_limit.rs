//! Per-client rate limiting over a sliding window.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Result of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Request admitted; `remaining` more fit in the current window.
    Allowed { remaining: u32 },
    /// Window exhausted.
    Limited,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed { .. })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LimiterError {
    #[error("rate limiter backend unavailable: {0}")]
    Unavailable(String),
}

/// Counts requests per client key and decides whether to admit them.
///
/// Implementations must make check-and-record atomic per key.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str) -> Result<Verdict, LimiterError>;

    /// Number of client keys currently tracked.
    fn tracked_keys(&self) -> usize {
        0
    }

    /// Evict keys with no requests inside the window. Returns how many were removed.
    fn sweep(&self) -> usize {
        0
    }
}

/// In-process sliding-log limiter.
///
/// Each key keeps the instants of its admitted requests inside the window,
/// so the log never holds more than `max_requests` entries.
pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: u32,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    fn record(&self, key: &str) -> Verdict {
        let now = Instant::now();
        // The entry guard holds the shard lock, making prune + check + push atomic for this key.
        let mut entry = self.windows.entry(key.to_string()).or_default();
        let log = entry.value_mut();

        prune(log, now, self.window);

        let used = log.len() as u32;
        if used >= self.max_requests {
            return Verdict::Limited;
        }
        log.push_back(now);
        Verdict::Allowed {
            remaining: self.max_requests - used - 1,
        }
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = log.front() {
        if now.duration_since(*oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn check(&self, key: &str) -> Result<Verdict, LimiterError> {
        Ok(self.record(key))
    }

    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, log| {
            prune(log, now, self.window);
            !log.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_limits_after_max_requests() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(10));

        assert_eq!(limiter.check("ip:1").await.unwrap(), Verdict::Allowed { remaining: 2 });
        assert_eq!(limiter.check("ip:1").await.unwrap(), Verdict::Allowed { remaining: 1 });
        assert_eq!(limiter.check("ip:1").await.unwrap(), Verdict::Allowed { remaining: 0 });
        assert_eq!(limiter.check("ip:1").await.unwrap(), Verdict::Limited);

        // Other keys are unaffected
        assert!(limiter.check("ip:2").await.unwrap().is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));

        limiter.check("k").await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.check("k").await.unwrap();
        assert_eq!(limiter.check("k").await.unwrap(), Verdict::Limited);

        // First request leaves the window, second is still inside it
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(limiter.check("k").await.unwrap(), Verdict::Allowed { remaining: 0 });
        assert_eq!(limiter.check("k").await.unwrap(), Verdict::Limited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limited_requests_do_not_extend_window() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(10));

        limiter.check("k").await.unwrap();
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert_eq!(limiter.check("k").await.unwrap(), Verdict::Limited);
        }
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.check("k").await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_concurrent_checks_admit_exactly_max() {
        let limiter = Arc::new(SlidingWindowLimiter::new(10, Duration::from_secs(60)));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.check("shared").await.unwrap() }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().is_allowed() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_idle_keys() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(10));
        limiter.check("old").await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        limiter.check("recent").await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(limiter.tracked_keys(), 2);
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
