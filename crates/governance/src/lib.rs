//! # GitHub MCP Governance
//!
//! Request governance for the GitHub MCP proxy. Sits between inbound tool
//! invocations and the upstream GitHub API:
//!
//! ```text
//! Tool call
//!     │
//!     ├──> ResponseCache (cacheable reads only)
//!     │      └─> hit: return without touching quota
//!     │
//!     ├──> RateLimiter (per-tool rolling window)
//!     │      └─> denied: RateLimitExceeded with reset time
//!     │
//!     ├──> PayloadGuard (request size, write tools)
//!     │
//!     ├──> ToolHandler (upstream API, outside all locks)
//!     │
//!     └──> PayloadGuard + cache store (response, read tools)
//! ```
//!
//! All state is per process. Horizontally scaled deployments multiply the
//! effective quota and dilute the cache hit rate; that tradeoff is accepted
//! rather than coordinated through a shared backing store. Swapping in such
//! a store later only has to reimplement [`RateLimiter`] and
//! [`ResponseCache`] behind the same interfaces.

mod cache;
mod config;
mod dispatch;
mod error;
mod payload;
mod rate_limit;
mod registry;
mod status;
mod util;

pub use cache::{fingerprint, CacheStats, ResponseCache};
pub use config::GovernanceConfig;
pub use dispatch::{Dispatcher, ToolHandler};
pub use error::{HandlerError, Result, ToolError};
pub use payload::PayloadGuard;
pub use rate_limit::{Decision, RateLimiter, RateStatus};
pub use registry::{ToolClass, ToolRegistry};
pub use status::{StatusReporter, StatusSnapshot};
