//! Read-only diagnostics over limiter and cache state.

use serde::Serialize;
use std::sync::Arc;

use crate::cache::{CacheStats, ResponseCache};
use crate::rate_limit::{RateLimiter, RateStatus};

/// Snapshot served by the `connection_status` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Per-tool rate state for every tool seen so far.
    pub tools: Vec<RateStatus>,
    pub cache: CacheStats,
}

/// Pure read view; never mutates, always succeeds.
#[derive(Clone)]
pub struct StatusReporter {
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl StatusReporter {
    pub fn new(limiter: Arc<RateLimiter>, cache: Arc<ResponseCache>) -> Self {
        Self { limiter, cache }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            tools: self.limiter.snapshot(),
            cache: self.cache.stats(),
        }
    }
}
