//! Fixed-window login rate limiter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use portal_auth::{RateDecision, RateLimiter};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Per-key fixed window: the first attempt opens the window, each further
/// attempt increments the count, and the window resets only once it has
/// fully elapsed. Attempts past the cap are `Limited`.
pub struct FixedWindowRateLimiter {
    max_attempts: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// 5 attempts per 15 minutes.
    pub fn for_login() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self, key: &str) -> RateDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;

        if entry.1 > self.max_attempts {
            RateDecision::Limited
        } else {
            RateDecision::Allowed
        }
    }
}
