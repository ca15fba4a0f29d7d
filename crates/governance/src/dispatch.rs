//! Tool-call orchestration.
//!
//! Per call: resolve the tool, consult the cache (reads only), ask the rate
//! limiter for admission, size-check the request (writes only), invoke the
//! upstream handler, size-check and cache the response (reads only).
//!
//! Cache hits return before admission and therefore never consume quota.
//! Admission is never rolled back: a call that fails downstream still spent
//! an upstream attempt, so it keeps its slot in the window.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::SystemTime;

use crate::cache::{fingerprint, ResponseCache};
use crate::config::GovernanceConfig;
use crate::error::{HandlerError, ToolError};
use crate::payload::PayloadGuard;
use crate::rate_limit::{Decision, RateLimiter};
use crate::registry::{ToolClass, ToolRegistry};
use crate::status::{StatusReporter, StatusSnapshot};
use crate::util::unix_secs;

/// Upstream collaborator performing the actual API call for one tool.
///
/// The dispatcher only needs this uniform capability; authentication and
/// transport are the handler's business. Calls are treated as synchronous
/// success-or-failure with no retry at this layer.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, tool: &str, args: &Map<String, Value>) -> Result<Value, HandlerError>;
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    guard: PayloadGuard,
    handler: Arc<dyn ToolHandler>,
}

impl Dispatcher {
    pub fn new(
        config: &GovernanceConfig,
        registry: ToolRegistry,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            limiter: Arc::new(RateLimiter::new(config.rate_limit, config.rate_window)),
            cache: Arc::new(ResponseCache::new(
                config.cache_ttl,
                config.max_cache_entries,
            )),
            guard: PayloadGuard::new(config.max_payload_bytes),
            handler,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn reporter(&self) -> StatusReporter {
        StatusReporter::new(self.limiter.clone(), self.cache.clone())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.reporter().snapshot()
    }

    pub async fn invoke(&self, tool: &str, args: Map<String, Value>) -> Result<Value, ToolError> {
        self.invoke_at(tool, args, SystemTime::now()).await
    }

    async fn invoke_at(
        &self,
        tool: &str,
        args: Map<String, Value>,
        now: SystemTime,
    ) -> Result<Value, ToolError> {
        let Some(class) = self.registry.class_of(tool) else {
            return Err(ToolError::UnknownTool(tool.to_string()));
        };

        // Diagnostics answer from local state: no cache, no quota, so the
        // status tool can always answer.
        if class == ToolClass::Diagnostic {
            return Ok(serde_json::to_value(self.snapshot()).unwrap_or(Value::Null));
        }

        let key = fingerprint(tool, &args);
        if class == ToolClass::Read {
            if let Some(value) = self.cache.get_at(&key, now) {
                log::debug!("cache hit for {tool}");
                return Ok(value);
            }
        }

        match self.limiter.admit_at(tool, now) {
            Decision::Admitted { remaining, .. } => {
                log::debug!("admitted {tool}, {remaining} calls left in window");
            }
            Decision::Denied { reset_at } => {
                log::warn!("rate limit hit for {tool}");
                return Err(ToolError::RateLimitExceeded {
                    tool: tool.to_string(),
                    reset_at: unix_secs(reset_at),
                });
            }
        }

        if class == ToolClass::Write {
            self.guard.check(&args)?;
        }

        // The upstream round trip happens outside every governance lock.
        let value = self.handler.call(tool, &args).await?;

        if class == ToolClass::Read {
            // Oversized responses are discarded, never returned or cached.
            self.guard.check(&value)?;
            self.cache.put_at(key, value.clone(), now);
        }

        Ok(value)
    }
}
