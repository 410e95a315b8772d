//! Per-route request rate limiting.
//!
//! A sliding one-second window per route: a route accepts at most
//! `requests_per_second` requests in any window and answers the rest
//! with `429 Too Many Requests`. Limits are global to the process, not
//! per client.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tracing::debug;

use crate::error::ApiError;

/// Sliding-window limiter keyed by route name.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<&'static str, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow `max_requests_per_second` per route; 0 disables limiting.
    pub fn new(max_requests_per_second: u32) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: usize::try_from(max_requests_per_second).unwrap_or(usize::MAX),
            window: Duration::from_secs(1),
        }
    }

    /// Use a window other than one second.
    #[cfg(test)]
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Whether any limit is enforced.
    pub const fn enabled(&self) -> bool {
        self.max_requests > 0
    }

    /// Record a request to `route` at `now`.
    ///
    /// Returns how long to wait when the route is over its limit.
    pub fn check_at(&self, route: &'static str, now: Instant) -> Result<(), Duration> {
        if !self.enabled() {
            return Ok(());
        }
        // The entry guard holds the route's shard lock until we return.
        let mut seen = self.windows.entry(route).or_default();
        while seen
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= self.window)
        {
            seen.pop_front();
        }
        if seen.len() >= self.max_requests {
            let oldest = seen.front().copied().unwrap_or(now);
            return Err(self
                .window
                .saturating_sub(now.saturating_duration_since(oldest)));
        }
        seen.push_back(now);
        Ok(())
    }

    /// Record a request to `route` now.
    pub fn check(&self, route: &'static str) -> Result<(), Duration> {
        self.check_at(route, Instant::now())
    }
}

/// Middleware state: which route a layer guards.
#[derive(Debug, Clone)]
pub struct RouteLimit {
    limiter: Arc<RateLimiter>,
    route: &'static str,
}

impl RouteLimit {
    /// Guard `route` with `limiter`.
    pub const fn new(limiter: Arc<RateLimiter>, route: &'static str) -> Self {
        Self { limiter, route }
    }
}

/// Reject the request with 429 when its route is over the limit.
pub async fn enforce(
    State(limit): State<RouteLimit>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match limit.limiter.check(limit.route) {
        Ok(()) => Ok(next.run(request).await),
        Err(retry_after) => {
            debug!(route = limit.route, ?retry_after, "rate limited");
            Err(ApiError::TooManyRequests(format!(
                "rate limit exceeded for {}, retry in {}ms",
                limit.route,
                retry_after.as_millis()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;

    #[test]
    fn second_request_in_window_is_rejected() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        assert!(limiter.check_at("create", start).is_ok());

        let retry = limiter.check_at("create", start + Duration::from_millis(400));
        assert_eq!(retry, Err(Duration::from_millis(600)));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        assert!(limiter.check_at("ingest", start).is_ok());
        assert!(limiter.check_at("ingest", start + Duration::from_millis(500)).is_ok());
        assert!(limiter.check_at("ingest", start + Duration::from_millis(900)).is_err());
        assert!(limiter.check_at("ingest", start + Duration::from_millis(1_000)).is_ok());
    }

    #[test]
    fn routes_are_independent() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();
        assert!(limiter.check_at("create", now).is_ok());
        assert!(limiter.check_at("history", now).is_ok());
        assert!(limiter.check_at("create", now).is_err());
    }

    #[test]
    fn zero_disables_limiting() {
        let limiter = RateLimiter::new(0);
        assert!(!limiter.enabled());
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.check_at("create", now).is_ok());
        }
    }

    #[test]
    fn custom_window() {
        let limiter = RateLimiter::new(1).with_window(Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at("create", start).is_ok());
        assert!(limiter.check_at("create", start + Duration::from_secs(5)).is_err());
        assert!(limiter.check_at("create", start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn concurrent_callers_share_one_budget() {
        let limiter = RateLimiter::new(5);
        let now = Instant::now();
        let accepted = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..4)
                            .filter(|_| limiter.check_at("ingest", now).is_ok())
                            .count()
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap_or_default())
                .sum::<usize>()
        });
        assert_eq!(accepted, 5);
        assert!(limiter.check_at("create", now).is_ok());
    }
}
