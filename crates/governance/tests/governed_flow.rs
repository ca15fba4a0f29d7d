//! End-to-end flow through the public dispatcher API.

use async_trait::async_trait;
use github_mcp_governance::{
    Dispatcher, GovernanceConfig, HandlerError, ToolClass, ToolError, ToolHandler, ToolRegistry,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingHandler {
    calls: AtomicUsize,
}

impl CountingHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolHandler for CountingHandler {
    async fn call(&self, tool: &str, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({ "tool": tool, "echo": args }))
    }
}

fn registry() -> ToolRegistry {
    [
        ("get_file_contents", ToolClass::Read),
        ("create_pull_request", ToolClass::Write),
        ("connection_status", ToolClass::Diagnostic),
    ]
    .into_iter()
    .collect()
}

fn config() -> GovernanceConfig {
    GovernanceConfig {
        rate_limit: 2,
        rate_window: Duration::from_secs(3600),
        cache_ttl: Duration::from_secs(300),
        max_cache_entries: 8,
        max_payload_bytes: 512,
    }
}

fn args_for(repo: &str) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("repo".to_string(), json!(repo));
    args
}

#[tokio::test]
async fn identical_reads_within_the_ttl_hit_the_cache() {
    let handler = CountingHandler::new();
    let dispatcher = Dispatcher::new(&config(), registry(), handler.clone());

    let first = dispatcher
        .invoke("get_file_contents", args_for("octocat/hello"))
        .await
        .unwrap();
    let second = dispatcher
        .invoke("get_file_contents", args_for("octocat/hello"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(handler.calls(), 1);

    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.cache.hits, 1);
    assert_eq!(snapshot.tools[0].count, 1);
}

#[tokio::test]
async fn quota_exhaustion_surfaces_a_structured_error() {
    let handler = CountingHandler::new();
    let dispatcher = Dispatcher::new(&config(), registry(), handler.clone());

    // Distinct args defeat the cache, so each call needs admission.
    dispatcher
        .invoke("get_file_contents", args_for("octocat/a"))
        .await
        .unwrap();
    dispatcher
        .invoke("get_file_contents", args_for("octocat/b"))
        .await
        .unwrap();

    let err = dispatcher
        .invoke("get_file_contents", args_for("octocat/c"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "rate_limit_exceeded");
    match err {
        ToolError::RateLimitExceeded { tool, reset_at } => {
            assert_eq!(tool, "get_file_contents");
            assert!(reset_at > 0);
        }
        other => panic!("expected RateLimitExceeded, got {other:?}"),
    }
    assert_eq!(handler.calls(), 2);
}

#[tokio::test]
async fn oversized_write_requests_are_rejected_locally() {
    let handler = CountingHandler::new();
    let dispatcher = Dispatcher::new(&config(), registry(), handler.clone());

    let mut args = args_for("octocat/hello");
    args.insert("body".to_string(), json!("x".repeat(1024)));
    let err = dispatcher
        .invoke("create_pull_request", args)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "payload_too_large");
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn connection_status_reflects_governed_traffic() {
    let handler = CountingHandler::new();
    let dispatcher = Dispatcher::new(&config(), registry(), handler.clone());

    dispatcher
        .invoke("get_file_contents", args_for("octocat/hello"))
        .await
        .unwrap();

    let status = dispatcher
        .invoke("connection_status", Map::new())
        .await
        .unwrap();
    assert_eq!(status["tools"][0]["tool"], "get_file_contents");
    assert_eq!(status["tools"][0]["limit"], 2);
    assert_eq!(status["cache"]["entries"], 1);
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn concurrent_reads_agree_on_a_single_upstream_fetch_or_refetch() {
    let handler = CountingHandler::new();
    let dispatcher = Dispatcher::new(&config(), registry(), handler.clone());

    // Warm the cache, then fan out concurrent identical reads.
    dispatcher
        .invoke("get_file_contents", args_for("octocat/hello"))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let dispatcher = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            dispatcher
                .invoke("get_file_contents", args_for("octocat/hello"))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Every concurrent call was a cache hit; quota spent exactly once.
    assert_eq!(handler.calls(), 1);
    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.tools[0].count, 1);
}
