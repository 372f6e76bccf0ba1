//! GitHub REST client backing the engine's source-control access.

use std::time::Duration;

use async_trait::async_trait;
use herald_core::pull_request::{ChangedFile, Comment, Commit, CommitStatus, PullRequest};
use herald_core::{RepoName, SourceControl};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Page size used for every list request.
const PER_PAGE: u32 = 100;

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    login: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            login: None,
        }
    }

    /// Login the token belongs to; used to recognise our own comments.
    pub fn with_login(mut self, login: Option<String>) -> Self {
        self.login = login;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, GitHubError> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GitHubError::Request(e.to_string()))?;
        Ok(self)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "herald")
            .header("Accept", "application/vnd.github+json")
    }

    async fn send(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, GitHubError> {
        let response = request
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GitHubError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GitHubError::Api(format!(
                "{} failed ({}): {}",
                what, status, text
            )));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<T, GitHubError> {
        debug!(path, "GitHub GET");
        let response = self.send(self.request(Method::GET, path), what).await?;
        response
            .json()
            .await
            .map_err(|e| GitHubError::Parse(e.to_string()))
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
        what: &str,
    ) -> Result<(), GitHubError> {
        debug!(path, "GitHub POST");
        self.send(self.request(Method::POST, path).json(body), what)
            .await?;
        Ok(())
    }

    /// Whether `user` is a member of `team`. Any answer other than 200 means no.
    async fn team_membership(
        &self,
        org: &str,
        team: &str,
        user: &str,
    ) -> Result<bool, GitHubError> {
        let path = format!("/orgs/{}/teams/{}/memberships/{}", org, team, user);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;
        Ok(response.status() == StatusCode::OK)
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn fetch_pull_request(
        &self,
        repo: &RepoName,
        number: u64,
    ) -> herald_core::Result<PullRequest> {
        let path = format!("/repos/{}/pulls/{}", repo, number);
        Ok(self.get_json(&path, "fetch pull request").await?)
    }

    async fn list_commits(&self, repo: &RepoName, number: u64) -> herald_core::Result<Vec<Commit>> {
        let path = format!(
            "/repos/{}/pulls/{}/commits?per_page={}",
            repo, number, PER_PAGE
        );
        Ok(self.get_json(&path, "list commits").await?)
    }

    async fn list_files(
        &self,
        repo: &RepoName,
        number: u64,
    ) -> herald_core::Result<Vec<ChangedFile>> {
        let path = format!("/repos/{}/pulls/{}/files?per_page={}", repo, number, PER_PAGE);
        Ok(self.get_json(&path, "list files").await?)
    }

    async fn list_comments(
        &self,
        repo: &RepoName,
        number: u64,
    ) -> herald_core::Result<Vec<Comment>> {
        let path = format!(
            "/repos/{}/issues/{}/comments?per_page={}",
            repo, number, PER_PAGE
        );
        Ok(self.get_json(&path, "list comments").await?)
    }

    async fn list_statuses(
        &self,
        repo: &RepoName,
        sha: &str,
    ) -> herald_core::Result<Vec<CommitStatus>> {
        let path = format!(
            "/repos/{}/commits/{}/statuses?per_page={}",
            repo, sha, PER_PAGE
        );
        Ok(self.get_json(&path, "list statuses").await?)
    }

    async fn set_status(
        &self,
        repo: &RepoName,
        sha: &str,
        status: &CommitStatus,
    ) -> herald_core::Result<()> {
        let path = format!("/repos/{}/statuses/{}", repo, sha);
        let body = json!({
            "state": status.state,
            "context": status.context,
            "description": status.description,
            "target_url": status.target_url,
        });
        Ok(self.post_json(&path, &body, "set status").await?)
    }

    async fn add_comment(
        &self,
        repo: &RepoName,
        number: u64,
        body: &str,
    ) -> herald_core::Result<()> {
        let path = format!("/repos/{}/issues/{}/comments", repo, number);
        Ok(self
            .post_json(&path, &json!({ "body": body }), "add comment")
            .await?)
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoName,
        state: &str,
        page_size: u32,
    ) -> herald_core::Result<Vec<PullRequest>> {
        let path = format!(
            "/repos/{}/pulls?state={}&per_page={}",
            repo, state, page_size
        );
        Ok(self.get_json(&path, "list pull requests").await?)
    }

    async fn is_team_member(&self, org: &str, team: &str, user: &str) -> herald_core::Result<bool> {
        Ok(self.team_membership(org, team, user).await?)
    }

    fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }
}

/// GitHub API errors.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<GitHubError> for herald_core::Error {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::NotFound(msg) => herald_core::Error::NotFound(msg),
            other => herald_core::Error::Upstream(other.to_string()),
        }
    }
}
