//! Thin pass-through to the GitHub REST API.
//!
//! One HTTP round trip per tool call (two for the probe-then-write tools).
//! No retries and no pagination management here: governance above already
//! bounds call volume, and failures surface verbatim as `UpstreamError`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use github_mcp_governance::{HandlerError, ToolHandler};
use reqwest::Method;
use serde_json::{json, Map, Value};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("github-mcp/", env!("CARGO_PKG_VERSION"));
const PER_PAGE: u32 = 100;

pub struct GitHubHandler {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubHandler {
    /// Requires `GITHUB_TOKEN`. A missing token is a startup error, not a
    /// per-call one.
    pub fn from_env() -> anyhow::Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| anyhow::anyhow!("GITHUB_TOKEN not set"))?;
        Self::new(token, DEFAULT_API_BASE.to_string())
    }

    pub fn new(token: String, api_base: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            token,
            api_base,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, HandlerError> {
        let response = request
            .send()
            .await
            .map_err(|err| HandlerError::new(format!("request failed: {err}")))?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body["message"]
                .as_str()
                .unwrap_or("GitHub API error")
                .to_string();
            return Err(HandlerError::with_status(message, status.as_u16()));
        }
        Ok(body)
    }

    async fn get_file_contents(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let repo = required_str(args, "repo")?;
        let path = required_str(args, "path")?;
        let branch = optional_str(args, "branch").unwrap_or("main");

        let body = self
            .send(
                self.request(Method::GET, &format!("/repos/{repo}/contents/{path}"))
                    .query(&[("ref", branch)]),
            )
            .await?;
        let content = decode_content(&body)?;
        Ok(json!({
            "repo": repo,
            "path": path,
            "branch": branch,
            "content": content,
        }))
    }

    async fn get_repo_info(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let repo = required_str(args, "repo")?;
        let body = self
            .send(self.request(Method::GET, &format!("/repos/{repo}")))
            .await?;
        Ok(json!({
            "full_name": body["full_name"],
            "description": body["description"],
            "default_branch": body["default_branch"],
            "private": body["private"],
            "language": body["language"],
            "stars": body["stargazers_count"],
            "forks": body["forks_count"],
            "open_issues": body["open_issues_count"],
        }))
    }

    async fn list_repos(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let visibility = optional_str(args, "visibility").unwrap_or("all");
        let body = self
            .send(self.request(Method::GET, "/user/repos").query(&[
                ("per_page", PER_PAGE.to_string().as_str()),
                ("visibility", visibility),
            ]))
            .await?;
        let repos: Vec<Value> = body
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|repo| {
                        json!({
                            "full_name": repo["full_name"],
                            "private": repo["private"],
                            "default_branch": repo["default_branch"],
                            "description": repo["description"],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "repos": repos }))
    }

    async fn list_branches(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let repo = required_str(args, "repo")?;
        let body = self
            .send(
                self.request(Method::GET, &format!("/repos/{repo}/branches"))
                    .query(&[("per_page", PER_PAGE.to_string().as_str())]),
            )
            .await?;
        let branches: Vec<Value> = body
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|branch| {
                        json!({
                            "name": branch["name"],
                            "sha": branch["commit"]["sha"],
                            "protected": branch["protected"],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "repo": repo, "branches": branches }))
    }

    async fn search_code(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let query = required_str(args, "query")?;
        let body = self
            .send(self.request(Method::GET, "/search/code").query(&[("q", query)]))
            .await?;
        let items: Vec<Value> = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        json!({
                            "repo": item["repository"]["full_name"],
                            "path": item["path"],
                            "url": item["html_url"],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "total_count": body["total_count"], "items": items }))
    }

    async fn create_or_update_file(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, HandlerError> {
        let repo = required_str(args, "repo")?;
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        let message = required_str(args, "message")?;
        let branch = optional_str(args, "branch").unwrap_or("main");

        // Probe for an existing file: its sha is required for updates, and a
        // 404 means this commit creates the file.
        let existing_sha = self.file_sha(repo, path, branch).await?;

        let mut payload = json!({
            "message": message,
            "content": BASE64.encode(content),
            "branch": branch,
        });
        if let Some(sha) = &existing_sha {
            payload["sha"] = json!(sha);
        }

        let body = self
            .send(
                self.request(Method::PUT, &format!("/repos/{repo}/contents/{path}"))
                    .json(&payload),
            )
            .await?;
        let action = if existing_sha.is_some() {
            "updated"
        } else {
            "created"
        };
        Ok(json!({
            "action": action,
            "path": path,
            "branch": branch,
            "commit": body["commit"]["sha"],
        }))
    }

    async fn create_branch(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let repo = required_str(args, "repo")?;
        let branch = required_str(args, "branch")?;
        let from_branch = optional_str(args, "from_branch").unwrap_or("main");

        let source = self
            .send(self.request(Method::GET, &format!("/repos/{repo}/git/ref/heads/{from_branch}")))
            .await?;
        let sha = source["object"]["sha"]
            .as_str()
            .ok_or_else(|| HandlerError::new(format!("branch '{from_branch}' has no commit sha")))?
            .to_string();

        self.send(
            self.request(Method::POST, &format!("/repos/{repo}/git/refs"))
                .json(&json!({
                    "ref": format!("refs/heads/{branch}"),
                    "sha": sha,
                })),
        )
        .await?;
        Ok(json!({
            "repo": repo,
            "branch": branch,
            "from_branch": from_branch,
            "sha": sha,
        }))
    }

    async fn create_pull_request(&self, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        let repo = required_str(args, "repo")?;
        let title = required_str(args, "title")?;
        let head = required_str(args, "head")?;
        let base = required_str(args, "base")?;

        let mut payload = json!({
            "title": title,
            "head": head,
            "base": base,
        });
        if let Some(body) = optional_str(args, "body") {
            payload["body"] = json!(body);
        }

        let response = self
            .send(
                self.request(Method::POST, &format!("/repos/{repo}/pulls"))
                    .json(&payload),
            )
            .await?;
        Ok(json!({
            "number": response["number"],
            "url": response["html_url"],
            "state": response["state"],
            "title": response["title"],
        }))
    }

    /// Sha of an existing file, or `None` when the path does not exist yet.
    async fn file_sha(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>, HandlerError> {
        let response = self
            .request(Method::GET, &format!("/repos/{repo}/contents/{path}"))
            .query(&[("ref", branch)])
            .send()
            .await
            .map_err(|err| HandlerError::new(format!("request failed: {err}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = body["message"]
                .as_str()
                .unwrap_or("GitHub API error")
                .to_string();
            return Err(HandlerError::with_status(message, status.as_u16()));
        }
        Ok(body["sha"].as_str().map(str::to_string))
    }
}

#[async_trait]
impl ToolHandler for GitHubHandler {
    async fn call(&self, tool: &str, args: &Map<String, Value>) -> Result<Value, HandlerError> {
        match tool {
            "get_file_contents" => self.get_file_contents(args).await,
            "get_repo_info" => self.get_repo_info(args).await,
            "list_repos" => self.list_repos(args).await,
            "list_branches" => self.list_branches(args).await,
            "search_code" => self.search_code(args).await,
            "create_or_update_file" => self.create_or_update_file(args).await,
            "create_branch" => self.create_branch(args).await,
            "create_pull_request" => self.create_pull_request(args).await,
            other => Err(HandlerError::new(format!("no upstream handler for '{other}'"))),
        }
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, HandlerError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::new(format!("missing required argument '{key}'")))
}

fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

/// The contents API returns base64 wrapped at 60 columns.
fn decode_content(body: &Value) -> Result<String, HandlerError> {
    let encoded: String = body["content"]
        .as_str()
        .unwrap_or_default()
        .split_whitespace()
        .collect();
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|err| HandlerError::new(format!("invalid base64 content: {err}")))?;
    String::from_utf8(bytes).map_err(|_| HandlerError::new("file content is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_str_reports_the_missing_key() {
        let args = Map::new();
        let err = required_str(&args, "repo").unwrap_err();
        assert!(err.message.contains("repo"));
        assert!(err.status.is_none());
    }

    #[test]
    fn decode_content_handles_wrapped_base64() {
        let body = json!({ "content": "aGVsbG8g\nd29ybGQ=\n" });
        assert_eq!(decode_content(&body).unwrap(), "hello world");
    }

    #[test]
    fn decode_content_rejects_invalid_base64() {
        let body = json!({ "content": "not base64!!!" });
        assert!(decode_content(&body).is_err());
    }
}
