//! Chooses which commits of a pull request to build.

use std::sync::Arc;

use herald_core::pull_request::PullRequest;
use herald_core::{CommitSelectionPolicy, RepoName, Result, SourceControl};
use tracing::{debug, warn};

pub struct CommitResolver {
    source: Arc<dyn SourceControl>,
}

impl CommitResolver {
    pub fn new(source: Arc<dyn SourceControl>) -> Self {
        Self { source }
    }

    /// Commit shas to build under `context`, oldest first.
    ///
    /// `last` always yields the head sha alone. `new` keeps only commits with
    /// no status under `context` and may be empty.
    pub async fn resolve(
        &self,
        policy: CommitSelectionPolicy,
        repo: &RepoName,
        pull_request: &PullRequest,
        context: &str,
    ) -> Result<Vec<String>> {
        let head = pull_request.head.sha.clone();

        let shas = match policy {
            CommitSelectionPolicy::Last => vec![head],
            CommitSelectionPolicy::All => self.commit_shas(repo, pull_request.number).await?,
            CommitSelectionPolicy::New => {
                let mut fresh = Vec::new();
                for sha in self.commit_shas(repo, pull_request.number).await? {
                    if !self.has_status(repo, &sha, context).await {
                        fresh.push(sha);
                    }
                }
                if fresh.is_empty() {
                    debug!(%repo, pr = pull_request.number, context, "Every commit already has a status");
                }
                fresh
            }
        };

        Ok(shas)
    }

    /// Whether `sha` carries any status under `context`.
    ///
    /// Lookup failures are logged and read as "no status".
    pub async fn has_status(&self, repo: &RepoName, sha: &str, context: &str) -> bool {
        match self.source.list_statuses(repo, sha).await {
            Ok(statuses) => statuses.iter().any(|s| s.context == context),
            Err(e) => {
                warn!(%repo, sha, context, error = %e, "Failed to look up commit statuses");
                false
            }
        }
    }

    async fn commit_shas(&self, repo: &RepoName, number: u64) -> Result<Vec<String>> {
        let commits = self.source.list_commits(repo, number).await?;
        Ok(commits.into_iter().map(|c| c.sha).collect())
    }
}
