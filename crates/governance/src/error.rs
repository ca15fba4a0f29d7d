use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Failure reported by a tool handler (the upstream API client).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    /// Upstream HTTP status, when one was received before the failure.
    pub status: Option<u16>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// `reset_at` is unix seconds; callers should back off until then.
    #[error("rate limit exceeded for '{tool}', window resets at {reset_at}")]
    RateLimitExceeded { tool: String, reset_at: u64 },

    #[error("payload of {actual} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { actual: usize, limit: usize },

    #[error("upstream call failed: {0}")]
    Upstream(#[from] HandlerError),
}

impl ToolError {
    /// Stable machine-readable kind, used in wire responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Upstream(_) => "upstream_error",
        }
    }
}
