//! MCP tool surface for the GitHub proxy.
//!
//! Each tool is a thin pass-through: its arguments are handed to the
//! governance [`Dispatcher`], which owns caching, rate limiting, and payload
//! checks before the upstream handler is ever touched.

use github_mcp_governance::{Dispatcher, ToolClass, ToolError, ToolRegistry};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The fixed classification table. Explicit by design: cacheability is
/// declared per tool, never inferred from its name.
pub fn tool_registry() -> ToolRegistry {
    [
        ("get_file_contents", ToolClass::Read),
        ("get_repo_info", ToolClass::Read),
        ("list_repos", ToolClass::Read),
        ("list_branches", ToolClass::Read),
        ("search_code", ToolClass::Read),
        ("create_or_update_file", ToolClass::Write),
        ("create_branch", ToolClass::Write),
        ("create_pull_request", ToolClass::Write),
        ("connection_status", ToolClass::Diagnostic),
    ]
    .into_iter()
    .collect()
}

/// GitHub MCP Service
#[derive(Clone)]
pub struct GitHubMcpService {
    dispatcher: Dispatcher,
    /// Tool router
    tool_router: ToolRouter<Self>,
}

impl GitHubMcpService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            tool_router: Self::tool_router(),
        }
    }

    async fn dispatch<T: Serialize>(
        &self,
        tool: &str,
        request: &T,
    ) -> Result<CallToolResult, McpError> {
        let args = match serde_json::to_value(request) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        match self.dispatcher.invoke(tool, args).await {
            Ok(value) => Ok(CallToolResult::success(vec![Content::text(
                serde_json::to_string_pretty(&value).unwrap_or_default(),
            )])),
            Err(err) => Ok(error_result(&err)),
        }
    }
}

fn error_result(err: &ToolError) -> CallToolResult {
    let mut body = serde_json::json!({
        "error": err.kind(),
        "message": err.to_string(),
    });
    if let ToolError::RateLimitExceeded { reset_at, .. } = err {
        body["reset_at"] = serde_json::json!(reset_at);
    }
    CallToolResult::error(vec![Content::text(body.to_string())])
}

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetFileContentsRequest {
    /// Repository in `owner/name` form
    #[schemars(description = "Repository in owner/name form")]
    pub repo: String,

    /// File path inside the repository
    #[schemars(description = "File path inside the repository")]
    pub path: String,

    /// Branch to read from (default: main)
    #[schemars(description = "Branch to read from (default: main)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetRepoInfoRequest {
    #[schemars(description = "Repository in owner/name form")]
    pub repo: String,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListReposRequest {
    /// Visibility filter: all, public, or private (default: all)
    #[schemars(description = "Visibility filter: all, public, or private")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListBranchesRequest {
    #[schemars(description = "Repository in owner/name form")]
    pub repo: String,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchCodeRequest {
    /// GitHub code-search query, e.g. `tokio repo:octocat/hello`
    #[schemars(description = "GitHub code search query")]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateOrUpdateFileRequest {
    #[schemars(description = "Repository in owner/name form")]
    pub repo: String,

    #[schemars(description = "File path inside the repository")]
    pub path: String,

    /// New file contents (UTF-8 text)
    #[schemars(description = "New file contents (UTF-8 text)")]
    pub content: String,

    /// Commit message
    #[schemars(description = "Commit message")]
    pub message: String,

    /// Branch to commit to (default: main)
    #[schemars(description = "Branch to commit to (default: main)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateBranchRequest {
    #[schemars(description = "Repository in owner/name form")]
    pub repo: String,

    /// Name of the branch to create
    #[schemars(description = "Name of the branch to create")]
    pub branch: String,

    /// Branch to fork from (default: main)
    #[schemars(description = "Branch to fork from (default: main)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_branch: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreatePullRequestRequest {
    #[schemars(description = "Repository in owner/name form")]
    pub repo: String,

    #[schemars(description = "Pull request title")]
    pub title: String,

    /// Branch with the changes
    #[schemars(description = "Branch with the changes")]
    pub head: String,

    /// Branch to merge into
    #[schemars(description = "Branch to merge into")]
    pub base: String,

    /// Pull request description
    #[schemars(description = "Pull request description")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConnectionStatusRequest {}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl GitHubMcpService {
    /// Read a file from a repository branch
    #[tool(description = "Read a file's decoded contents from a repository branch. Results are cached for a few minutes.")]
    pub async fn get_file_contents(
        &self,
        Parameters(request): Parameters<GetFileContentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_file_contents", &request).await
    }

    /// Repository metadata
    #[tool(description = "Get repository metadata: description, default branch, visibility, counts.")]
    pub async fn get_repo_info(
        &self,
        Parameters(request): Parameters<GetRepoInfoRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("get_repo_info", &request).await
    }

    #[tool(description = "List repositories accessible to the authenticated user.")]
    pub async fn list_repos(
        &self,
        Parameters(request): Parameters<ListReposRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("list_repos", &request).await
    }

    #[tool(description = "List branches of a repository.")]
    pub async fn list_branches(
        &self,
        Parameters(request): Parameters<ListBranchesRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("list_branches", &request).await
    }

    #[tool(description = "Search code across GitHub with the standard code-search query syntax.")]
    pub async fn search_code(
        &self,
        Parameters(request): Parameters<SearchCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("search_code", &request).await
    }

    /// Create a file, or update it when it already exists
    #[tool(description = "Create or update a file on a branch with a commit message. Reports whether the file was created or updated.")]
    pub async fn create_or_update_file(
        &self,
        Parameters(request): Parameters<CreateOrUpdateFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("create_or_update_file", &request).await
    }

    #[tool(description = "Create a branch from an existing one (default source: main).")]
    pub async fn create_branch(
        &self,
        Parameters(request): Parameters<CreateBranchRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("create_branch", &request).await
    }

    #[tool(description = "Open a pull request from head into base.")]
    pub async fn create_pull_request(
        &self,
        Parameters(request): Parameters<CreatePullRequestRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("create_pull_request", &request).await
    }

    /// Local diagnostics; never rate limited, never cached
    #[tool(description = "Per-tool rate-limit state and cache statistics for this server instance. Always answers; never consumes quota.")]
    pub async fn connection_status(
        &self,
        Parameters(request): Parameters<ConnectionStatusRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch("connection_status", &request).await
    }
}

#[tool_handler]
impl ServerHandler for GitHubMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("GitHub proxy for AI agents. Reads (file contents, repo info, listings, code search) are cached for a few minutes and every tool has an hourly call quota; check 'connection_status' for remaining quota and reset times before retrying after a rate-limit error.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
