//! GitHub MCP Server
//!
//! Proxies a fixed set of GitHub tools to AI agents via MCP, with per-tool
//! rate limiting, time-bounded response caching, and payload-size checks.
//!
//! ## Tools
//!
//! - `get_file_contents` - Read a file from a repository branch
//! - `get_repo_info` - Repository metadata
//! - `list_repos` / `list_branches` - Listings for the authenticated user
//! - `search_code` - Code search
//! - `create_or_update_file` / `create_branch` / `create_pull_request` - Writes
//! - `connection_status` - Rate-limit and cache diagnostics, never throttled
//!
//! ## Usage
//!
//! Requires `GITHUB_TOKEN`. Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "github": {
//!       "command": "github-mcp"
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::sync::Arc;

mod tools;
mod upstream;

use github_mcp_governance::{Dispatcher, GovernanceConfig};
use tools::GitHubMcpService;
use upstream::GitHubHandler;

#[tokio::main]
async fn main() -> Result<()> {
    // Configure logging to stderr only (stdout is for MCP protocol)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("Starting GitHub MCP server");

    let config = GovernanceConfig::from_env();
    let handler = Arc::new(GitHubHandler::from_env()?);
    let dispatcher = Dispatcher::new(&config, tools::tool_registry(), handler);

    let service = GitHubMcpService::new(dispatcher);
    let server = service.serve(stdio()).await?;

    // Wait for shutdown
    server.waiting().await?;

    log::info!("GitHub MCP server stopped");
    Ok(())
}
