//! Per-domain sliding-window rate limiting.
//!
//! Each target domain gets its own window of admission timestamps. A job
//! counts against its window at admission time, so a job that later times
//! out still consumed a slot (admission-based accounting).
//!
//! State lives in process memory only. A horizontally scaled deployment
//! needs a shared store behind the same `allow` interface; this is a
//! documented limitation, not something this module papers over.

mod window;

use std::fmt;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use url::Url;

use window::Window;

/// Default sliding-window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default number of admissions per domain per window
pub const DEFAULT_MAX_REQUESTS: usize = 10;

/// Normalized per-domain key for rate limiting.
///
/// Lowercased so `API.example.com` and `api.example.com` share a window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainKey(String);

impl DomainKey {
    /// Get the domain as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainKey {
    fn from(domain: &str) -> Self {
        DomainKey(domain.to_lowercase())
    }
}

impl TryFrom<&Url> for DomainKey {
    type Error = crate::types::RejectReason;

    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        let host = url
            .host_str()
            .ok_or(crate::types::RejectReason::MissingHostname)?;
        Ok(DomainKey::from(host))
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sliding-window counter over domain keys.
///
/// `allow` is fully synchronous; the per-shard lock inside the map is never
/// held across DNS resolution or the HTTP request.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<DomainKey, Window>,
    window: Duration,
    max_requests: usize,
}

impl RateLimiter {
    /// Create a rate limiter admitting `max_requests` per domain per `window`
    #[must_use]
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Try to admit one request for `domain`.
    ///
    /// Expired timestamps are pruned first; if the window is full the call
    /// returns `false` and records nothing, otherwise the admission is
    /// recorded and the call returns `true`.
    pub fn allow(&self, domain: &DomainKey) -> bool {
        let now = Instant::now();
        let mut window = self
            .windows
            .entry(domain.clone())
            .or_insert_with(|| Window::with_capacity(self.max_requests));

        if let Some(cutoff) = now.checked_sub(self.window) {
            window.prune(cutoff);
        }
        if window.len() >= self.max_requests {
            log::debug!("rate limit exhausted for {domain}");
            return false;
        }
        window.record(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_exactly_max_requests_per_window() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);
        let domain = DomainKey::from("example.com");

        for _ in 0..10 {
            assert!(limiter.allow(&domain));
        }
        assert!(!limiter.allow(&domain));
    }

    #[test]
    fn admits_again_after_the_window_elapses() {
        let limiter = RateLimiter::new(Duration::from_millis(50), 2);
        let domain = DomainKey::from("example.com");

        assert!(limiter.allow(&domain));
        assert!(limiter.allow(&domain));
        assert!(!limiter.allow(&domain));

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.allow(&domain));
    }

    #[test]
    fn domains_have_independent_windows() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.allow(&DomainKey::from("a.example.com")));
        assert!(!limiter.allow(&DomainKey::from("a.example.com")));
        assert!(limiter.allow(&DomainKey::from("b.example.com")));
    }

    #[test]
    fn domain_key_is_case_insensitive() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.allow(&DomainKey::from("API.Example.com")));
        assert!(!limiter.allow(&DomainKey::from("api.example.com")));
    }

    #[test]
    fn domain_key_from_url() {
        let url = Url::parse("https://API.example.com/path").unwrap();
        assert_eq!(DomainKey::try_from(&url).unwrap().as_str(), "api.example.com");
    }
}
