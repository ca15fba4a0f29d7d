//! Fixed configuration surface for the governance layer.
//!
//! Values are read once at startup; nothing here is runtime-mutable.

use std::time::Duration;

pub const DEFAULT_RATE_LIMIT: u32 = 100;
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 256;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

const MAX_RATE_LIMIT: u64 = 1_000_000;
const MAX_WINDOW_SECS: u64 = 24 * 60 * 60;
const MAX_TTL_SECS: u64 = 24 * 60 * 60;
const MAX_CACHE_ENTRIES: u64 = 65_536;
const MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceConfig {
    /// Calls admitted per tool per rolling window.
    pub rate_limit: u32,
    /// Length of the rolling window.
    pub rate_window: Duration,
    /// How long a cached response stays valid.
    pub cache_ttl: Duration,
    /// Bound on distinct cached fingerprints; oldest entries evict first.
    pub max_cache_entries: usize,
    /// Byte cap applied to request and response payloads.
    pub max_payload_bytes: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: DEFAULT_RATE_WINDOW,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl GovernanceConfig {
    /// Defaults with `GITHUB_MCP_*` environment overrides applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rate_limit: parse_positive(
                std::env::var("GITHUB_MCP_RATE_LIMIT").ok().as_deref(),
                u64::from(defaults.rate_limit),
                MAX_RATE_LIMIT,
            ) as u32,
            rate_window: Duration::from_secs(parse_positive(
                std::env::var("GITHUB_MCP_RATE_WINDOW_SECS").ok().as_deref(),
                defaults.rate_window.as_secs(),
                MAX_WINDOW_SECS,
            )),
            cache_ttl: Duration::from_secs(parse_positive(
                std::env::var("GITHUB_MCP_CACHE_TTL_SECS").ok().as_deref(),
                defaults.cache_ttl.as_secs(),
                MAX_TTL_SECS,
            )),
            max_cache_entries: parse_positive(
                std::env::var("GITHUB_MCP_MAX_CACHE_ENTRIES").ok().as_deref(),
                defaults.max_cache_entries as u64,
                MAX_CACHE_ENTRIES,
            ) as usize,
            max_payload_bytes: parse_positive(
                std::env::var("GITHUB_MCP_MAX_PAYLOAD_BYTES").ok().as_deref(),
                defaults.max_payload_bytes as u64,
                MAX_PAYLOAD_BYTES,
            ) as usize,
        }
    }
}

fn parse_positive(raw: Option<&str>, default_value: u64, max: u64) -> u64 {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default_value)
        .min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positive_accepts_plain_numbers() {
        assert_eq!(parse_positive(Some("250"), 100, 1_000), 250);
    }

    #[test]
    fn parse_positive_falls_back_on_garbage() {
        assert_eq!(parse_positive(Some("abc"), 100, 1_000), 100);
        assert_eq!(parse_positive(Some(""), 100, 1_000), 100);
        assert_eq!(parse_positive(Some("  "), 100, 1_000), 100);
        assert_eq!(parse_positive(None, 100, 1_000), 100);
    }

    #[test]
    fn parse_positive_rejects_zero_and_clamps() {
        assert_eq!(parse_positive(Some("0"), 100, 1_000), 100);
        assert_eq!(parse_positive(Some("99999"), 100, 1_000), 1_000);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = GovernanceConfig::default();
        assert_eq!(config.rate_limit, 100);
        assert_eq!(config.rate_window, Duration::from_secs(3600));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.max_cache_entries, 256);
        assert_eq!(config.max_payload_bytes, 1024 * 1024);
    }
}
