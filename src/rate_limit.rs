//! Sliding-window rate limiting keyed by client IP.
//!
//! An injected service rather than a module-global map, so call sites never
//! touch the storage and the whole thing can be swapped for a distributed
//! store later. Stale keys are pruned lazily on access, at most once per
//! sweep interval.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: usize,
    /// How long until the oldest in-window request ages out. Set only when
    /// denied.
    pub retry_after: Option<Duration>,
}

struct Inner {
    requests: HashMap<String, Vec<Instant>>,
    last_sweep: Instant,
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    sweep_interval: Duration,
    inner: Mutex<Inner>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration, sweep_interval: Duration) -> Self {
        Self {
            max_requests,
            window,
            sweep_interval,
            inner: Mutex::new(Inner {
                requests: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Check whether `key` may proceed and, if so, record the request.
    pub fn check_and_record(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if now.duration_since(inner.last_sweep) >= self.sweep_interval {
            let window = self.window;
            inner.requests.retain(|_, timestamps| {
                timestamps.retain(|t| now.duration_since(*t) < window);
                !timestamps.is_empty()
            });
            inner.last_sweep = now;
        }

        let timestamps = inner.requests.entry(key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps[0];
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after: Some(retry_after),
            };
        }

        timestamps.push(now);
        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - timestamps.len(),
            retry_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: usize) -> RateLimiter {
        RateLimiter::new(max, Duration::from_secs(3600), Duration::from_secs(300))
    }

    #[test]
    fn allows_up_to_the_quota_then_denies() {
        let limiter = limiter(3);

        for i in 0..3 {
            let decision = limiter.check_and_record("1.2.3.4");
            assert!(decision.allowed, "request {i} should pass");
            assert_eq!(decision.remaining, 2 - i);
        }

        let denied = limiter.check_and_record("1.2.3.4");
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after.unwrap() <= Duration::from_secs(3600));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1);
        assert!(limiter.check_and_record("1.1.1.1").allowed);
        assert!(!limiter.check_and_record("1.1.1.1").allowed);
        assert!(limiter.check_and_record("2.2.2.2").allowed);
    }

    #[test]
    fn requests_age_out_of_the_window() {
        // Zero-length window: every recorded request is already stale.
        let limiter = RateLimiter::new(1, Duration::ZERO, Duration::from_secs(300));
        assert!(limiter.check_and_record("1.1.1.1").allowed);
        assert!(limiter.check_and_record("1.1.1.1").allowed);
    }

    #[test]
    fn sweep_prunes_stale_keys() {
        let limiter = RateLimiter::new(5, Duration::ZERO, Duration::ZERO);
        limiter.check_and_record("1.1.1.1");
        limiter.check_and_record("2.2.2.2");

        // Next access sweeps; both keys hold only stale timestamps.
        limiter.check_and_record("3.3.3.3");
        let inner = limiter.inner.lock();
        assert!(!inner.requests.contains_key("1.1.1.1"));
        assert!(!inner.requests.contains_key("2.2.2.2"));
    }
}
