//! Source-control capability.

use async_trait::async_trait;

use crate::pull_request::{ChangedFile, Comment, Commit, CommitStatus, PullRequest};
use crate::{RepoName, Result};

/// Operations the engine needs from the source-control system.
///
/// Implementations map a 404 from the remote API to [`crate::Error::NotFound`].
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn fetch_pull_request(&self, repo: &RepoName, number: u64) -> Result<PullRequest>;

    /// Commits of a pull request, oldest first.
    async fn list_commits(&self, repo: &RepoName, number: u64) -> Result<Vec<Commit>>;

    async fn list_files(&self, repo: &RepoName, number: u64) -> Result<Vec<ChangedFile>>;

    async fn list_comments(&self, repo: &RepoName, number: u64) -> Result<Vec<Comment>>;

    async fn list_statuses(&self, repo: &RepoName, sha: &str) -> Result<Vec<CommitStatus>>;

    async fn set_status(&self, repo: &RepoName, sha: &str, status: &CommitStatus) -> Result<()>;

    async fn add_comment(&self, repo: &RepoName, number: u64, body: &str) -> Result<()>;

    async fn list_pull_requests(
        &self,
        repo: &RepoName,
        state: &str,
        page_size: u32,
    ) -> Result<Vec<PullRequest>>;

    /// Whether `user` belongs to `team` in `org`.
    async fn is_team_member(&self, org: &str, team: &str, user: &str) -> Result<bool>;

    /// Login the service comments as, if known.
    fn login(&self) -> Option<&str> {
        None
    }
}
