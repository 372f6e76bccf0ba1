//! Pull request types.
//!
//! Field names follow the GitHub REST and webhook payloads so the same types
//! decode API responses and webhook bodies.

use serde::{Deserialize, Serialize};

use crate::{CommitState, RepoName};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub full_name: RepoName,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    /// Absent when the source fork has been deleted.
    pub repo: Option<RepoRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub html_url: String,
    pub user: User,
    pub head: GitRef,
    pub base: GitRef,
    /// `None` while the source-control system is still computing it.
    #[serde(default)]
    pub mergeable: Option<bool>,
}

impl PullRequest {
    /// Repository the changes come from, falling back to the base repository.
    pub fn head_repo(&self) -> Option<&RepoName> {
        self.head
            .repo
            .as_ref()
            .or(self.base.repo.as_ref())
            .map(|r| &r.full_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: User,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: CommitState,
    pub context: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Commits, files and comments of a loaded pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestContent {
    pub commits: Vec<Commit>,
    pub files: Vec<ChangedFile>,
    pub comments: Vec<Comment>,
}

impl PullRequestContent {
    /// Whether a comment carrying `marker` exists, optionally restricted to one author.
    pub fn has_comment(&self, marker: &str, author: Option<&str>) -> bool {
        self.comments.iter().any(|c| {
            c.body.contains(marker)
                && author.is_none_or(|a| c.user.login.eq_ignore_ascii_case(a))
        })
    }
}

/// A pull request together with its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPullRequest {
    pub repo: RepoName,
    pub pull_request: PullRequest,
    pub content: PullRequestContent,
}
