//! Fixed-window rate limiting per (principal, tool).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One counting window.
#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Counts calls per `(principal, tool)` pair inside a window that restarts
/// once `window` has elapsed since its first call.
///
/// Check-and-increment happens under a single lock, so concurrent callers
/// cannot both take the last slot.
pub struct RateLimiter {
    window: Duration,
    windows: Mutex<HashMap<(String, String), Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Take one slot for `principal` on `tool`. Returns false when `limit`
    /// calls have already been made in the current window.
    pub fn check(&self, principal: &str, tool: &str, limit: u32) -> bool {
        self.check_at(principal, tool, limit, Instant::now())
    }

    /// `check` against an explicit clock reading.
    pub fn check_at(&self, principal: &str, tool: &str, limit: u32, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let window = windows
            .entry((principal.to_string(), tool.to_string()))
            .or_insert(Window { start: now, count: 0 });

        if now.saturating_duration_since(window.start) >= self.window {
            *window = Window { start: now, count: 0 };
        }

        if window.count >= limit {
            return false;
        }
        window.count += 1;
        true
    }

    /// Calls left for `principal` on `tool` in the current window.
    pub fn remaining(&self, principal: &str, tool: &str, limit: u32) -> u32 {
        self.remaining_at(principal, tool, limit, Instant::now())
    }

    pub fn remaining_at(&self, principal: &str, tool: &str, limit: u32, now: Instant) -> u32 {
        let windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match windows.get(&(principal.to_string(), tool.to_string())) {
            Some(w) if now.saturating_duration_since(w.start) < self.window => {
                limit.saturating_sub(w.count)
            }
            _ => limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn nth_plus_one_call_is_limited_until_window_resets() {
        let limiter = RateLimiter::new(MINUTE);
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(limiter.check_at("alice", "web_search", 3, t0 + Duration::from_secs(i)));
        }
        assert!(!limiter.check_at("alice", "web_search", 3, t0 + Duration::from_secs(59)));
        assert!(limiter.check_at("alice", "web_search", 3, t0 + MINUTE));
    }

    #[test]
    fn windows_are_keyed_by_principal_and_tool() {
        let limiter = RateLimiter::new(MINUTE);
        let t0 = Instant::now();

        assert!(limiter.check_at("alice", "echo", 1, t0));
        assert!(!limiter.check_at("alice", "echo", 1, t0));
        assert!(limiter.check_at("bob", "echo", 1, t0));
        assert!(limiter.check_at("alice", "calculator", 1, t0));
    }

    #[test]
    fn remaining_tracks_window() {
        let limiter = RateLimiter::new(MINUTE);
        let t0 = Instant::now();

        assert_eq!(limiter.remaining_at("alice", "echo", 5, t0), 5);
        limiter.check_at("alice", "echo", 5, t0);
        limiter.check_at("alice", "echo", 5, t0);
        assert_eq!(limiter.remaining_at("alice", "echo", 5, t0), 3);
        assert_eq!(limiter.remaining_at("alice", "echo", 5, t0 + MINUTE), 5);
    }

    #[test]
    fn zero_limit_always_rejects() {
        let limiter = RateLimiter::new(MINUTE);
        assert!(!limiter.check("alice", "echo", 0));
    }

    #[test]
    fn concurrent_callers_share_exactly_limit_slots() {
        let limiter = Arc::new(RateLimiter::new(MINUTE));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..4).filter(|_| limiter.check("alice", "search", 25)).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 25);
        assert_eq!(limiter.remaining("alice", "search", 25), 0);
        assert!(limiter.check("bob", "search", 25));
    }
}
