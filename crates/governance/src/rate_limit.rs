//! Per-tool rate limiting over a rolling window.
//!
//! One counter per tool id, created lazily on first call and kept for the
//! process lifetime. The window resets in place the first time an operation
//! observes `now - window_start >= window`; denial never consumes quota.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::util::unix_secs;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted { remaining: u32, reset_at: SystemTime },
    Denied { reset_at: SystemTime },
}

/// Point-in-time view of one tool's counter, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateStatus {
    pub tool: String,
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    /// Unix seconds at which the current window rolls over.
    pub reset_at: u64,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    window_start: SystemTime,
    count: u32,
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    states: Mutex<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Admission check for one inbound call. Increments the counter only on
    /// admission.
    pub fn admit(&self, tool: &str) -> Decision {
        self.admit_at(tool, SystemTime::now())
    }

    pub(crate) fn admit_at(&self, tool: &str, now: SystemTime) -> Decision {
        let mut states = lock_states(&self.states);
        let state = states.entry(tool.to_string()).or_insert(WindowState {
            window_start: now,
            count: 0,
        });

        if elapsed(state.window_start, now) >= self.window {
            state.window_start = now;
            state.count = 0;
        }

        let reset_at = state.window_start + self.window;
        if state.count < self.limit {
            state.count += 1;
            Decision::Admitted {
                remaining: self.limit - state.count,
                reset_at,
            }
        } else {
            Decision::Denied { reset_at }
        }
    }

    /// Read-only view of one tool's counter. Never mutates: an expired
    /// window is reported as if it had just been reset.
    pub fn status(&self, tool: &str) -> Option<RateStatus> {
        self.status_at(tool, SystemTime::now())
    }

    pub(crate) fn status_at(&self, tool: &str, now: SystemTime) -> Option<RateStatus> {
        let states = lock_states(&self.states);
        states
            .get(tool)
            .map(|state| self.view(tool, state, now))
    }

    /// Read-only view of every tracked tool, sorted by tool id.
    pub fn snapshot(&self) -> Vec<RateStatus> {
        self.snapshot_at(SystemTime::now())
    }

    pub(crate) fn snapshot_at(&self, now: SystemTime) -> Vec<RateStatus> {
        let states = lock_states(&self.states);
        let mut statuses: Vec<RateStatus> = states
            .iter()
            .map(|(tool, state)| self.view(tool, state, now))
            .collect();
        statuses.sort_by(|a, b| a.tool.cmp(&b.tool));
        statuses
    }

    fn view(&self, tool: &str, state: &WindowState, now: SystemTime) -> RateStatus {
        let (count, window_start) = if elapsed(state.window_start, now) >= self.window {
            (0, now)
        } else {
            (state.count, state.window_start)
        };
        RateStatus {
            tool: tool.to_string(),
            count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            reset_at: unix_secs(window_start + self.window),
        }
    }
}

fn elapsed(start: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(start).unwrap_or_default()
}

fn lock_states(
    states: &Mutex<HashMap<String, WindowState>>,
) -> std::sync::MutexGuard<'_, HashMap<String, WindowState>> {
    // A poisoned lock only means some other caller panicked mid-update; the
    // counters themselves are always left consistent.
    states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WINDOW: Duration = Duration::from_secs(3600);

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn admits_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(3, WINDOW);
        let now = t0();

        for expected_remaining in [2, 1, 0] {
            match limiter.admit_at("search_code", now) {
                Decision::Admitted { remaining, reset_at } => {
                    assert_eq!(remaining, expected_remaining);
                    assert_eq!(reset_at, now + WINDOW);
                }
                Decision::Denied { .. } => panic!("call should have been admitted"),
            }
        }

        match limiter.admit_at("search_code", now + Duration::from_secs(10)) {
            Decision::Denied { reset_at } => assert_eq!(reset_at, now + WINDOW),
            Decision::Admitted { .. } => panic!("fourth call should be denied"),
        }
    }

    #[test]
    fn window_reset_restores_full_quota() {
        let limiter = RateLimiter::new(3, WINDOW);
        let now = t0();
        for _ in 0..3 {
            limiter.admit_at("search_code", now);
        }
        assert!(matches!(
            limiter.admit_at("search_code", now + WINDOW - Duration::from_secs(1)),
            Decision::Denied { .. }
        ));

        // Exactly one window later the counter starts over.
        match limiter.admit_at("search_code", now + WINDOW) {
            Decision::Admitted { remaining, reset_at } => {
                assert_eq!(remaining, 2);
                assert_eq!(reset_at, now + WINDOW + WINDOW);
            }
            Decision::Denied { .. } => panic!("reset window should admit"),
        }
    }

    #[test]
    fn denial_does_not_consume_quota() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = t0();
        limiter.admit_at("get_repo_info", now);
        for _ in 0..5 {
            assert!(matches!(
                limiter.admit_at("get_repo_info", now),
                Decision::Denied { .. }
            ));
        }
        let status = limiter.status_at("get_repo_info", now).unwrap();
        assert_eq!(status.count, 1);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn tools_are_counted_independently() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = t0();
        assert!(matches!(
            limiter.admit_at("list_repos", now),
            Decision::Admitted { .. }
        ));
        assert!(matches!(
            limiter.admit_at("list_branches", now),
            Decision::Admitted { .. }
        ));
        assert!(matches!(
            limiter.admit_at("list_repos", now),
            Decision::Denied { .. }
        ));
    }

    #[test]
    fn status_does_not_mutate_and_reports_expired_windows_as_fresh() {
        let limiter = RateLimiter::new(3, WINDOW);
        let now = t0();
        limiter.admit_at("get_file_contents", now);

        let live = limiter.status_at("get_file_contents", now).unwrap();
        assert_eq!(live.count, 1);
        assert_eq!(live.remaining, 2);
        assert_eq!(live.reset_at, unix_secs(now + WINDOW));

        let expired = limiter
            .status_at("get_file_contents", now + WINDOW + Duration::from_secs(5))
            .unwrap();
        assert_eq!(expired.count, 0);
        assert_eq!(expired.remaining, 3);

        // The view above must not have reset the stored state.
        let stored = limiter.status_at("get_file_contents", now).unwrap();
        assert_eq!(stored.count, 1);
    }

    #[test]
    fn status_is_none_for_untracked_tools() {
        let limiter = RateLimiter::new(3, WINDOW);
        assert!(limiter.status("never_called").is_none());
    }

    #[test]
    fn snapshot_is_sorted_by_tool() {
        let limiter = RateLimiter::new(3, WINDOW);
        let now = t0();
        limiter.admit_at("search_code", now);
        limiter.admit_at("get_repo_info", now);
        limiter.admit_at("list_repos", now);

        let tools: Vec<String> = limiter
            .snapshot_at(now)
            .into_iter()
            .map(|s| s.tool)
            .collect();
        assert_eq!(tools, vec!["get_repo_info", "list_repos", "search_code"]);
    }
}
