//! Commit status writes.

use std::sync::Arc;

use herald_core::pull_request::CommitStatus;
use herald_core::{CommitState, RepoName, Result, SourceControl};
use tracing::info;

pub struct StatusReporter {
    source: Arc<dyn SourceControl>,
}

impl StatusReporter {
    pub fn new(source: Arc<dyn SourceControl>) -> Self {
        Self { source }
    }

    pub async fn report(
        &self,
        repo: &RepoName,
        context: &str,
        sha: &str,
        state: CommitState,
        description: &str,
        target_url: &str,
    ) -> Result<()> {
        let status = CommitStatus {
            state,
            context: context.to_string(),
            description: Some(description.to_string()),
            target_url: Some(target_url.to_string()),
        };

        self.source.set_status(repo, sha, &status).await?;
        info!(%repo, sha, context, %state, "Set commit status");
        Ok(())
    }
}
