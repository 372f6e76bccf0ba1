//! Team-based authorization of pull request authors and reviewers.

use std::sync::Arc;

use herald_core::pull_request::LoadedPullRequest;
use herald_core::{CommitState, RepoName, Result, SourceControl};
use tracing::{debug, info};

use crate::reporter::StatusReporter;

/// Hidden marker identifying the unapproved-user comment.
pub const UNAPPROVED_MARKER: &str = "<!-- herald:unapproved-user -->";

const AUTHORIZED_DESCRIPTION: &str = "This PR is now authorized!";

pub struct AuthorizationGate {
    source: Arc<dyn SourceControl>,
    reporter: StatusReporter,
    org: String,
    teams: Vec<String>,
    context: String,
    listing_url: String,
    comment_author: Option<String>,
}

impl AuthorizationGate {
    pub fn new(
        source: Arc<dyn SourceControl>,
        org: impl Into<String>,
        teams: Vec<String>,
        context: impl Into<String>,
        listing_url: impl Into<String>,
    ) -> Self {
        let comment_author = source.login().map(str::to_string);
        Self {
            reporter: StatusReporter::new(source.clone()),
            source,
            org: org.into(),
            teams,
            context: context.into(),
            listing_url: listing_url.into(),
            comment_author,
        }
    }

    /// Restrict comment de-duplication to comments by `login`.
    pub fn with_comment_author(mut self, login: Option<String>) -> Self {
        if login.is_some() {
            self.comment_author = login;
        }
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Whether `login` belongs to any allowed team. An empty team list allows everyone.
    pub async fn is_authorized(&self, login: &str) -> Result<bool> {
        if self.teams.is_empty() {
            return Ok(true);
        }

        for team in &self.teams {
            if self.source.is_team_member(&self.org, team, login).await? {
                debug!(login, team = %team, "User is a team member");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Leaves one explanatory comment and marks the head commit as unauthorized.
    pub async fn reject_and_notify(&self, loaded: &LoadedPullRequest) -> Result<()> {
        let pr = &loaded.pull_request;

        if loaded
            .content
            .has_comment(UNAPPROVED_MARKER, self.comment_author.as_deref())
        {
            debug!(repo = %loaded.repo, pr = pr.number, "Unapproved-user comment already present");
        } else {
            let body = format!(
                "{}\nThanks for your submission, @{}. Tests can only be started by an authorized \
                 member of the {} organization. A member can submit a review saying `rerun ci` \
                 to start them.",
                UNAPPROVED_MARKER, pr.user.login, self.org
            );
            self.source.add_comment(&loaded.repo, pr.number, &body).await?;
            info!(
                repo = %loaded.repo,
                pr = pr.number,
                user = %pr.user.login,
                "Posted unapproved-user comment"
            );
        }

        let description = format!("Please contact the {} team to run tests", self.org);
        self.reporter
            .report(
                &loaded.repo,
                &self.context,
                &pr.head.sha,
                CommitState::Failure,
                &description,
                &self.listing_url,
            )
            .await
    }

    /// Replaces the unauthorized status on `sha` with a success.
    pub async fn clear_rejection(&self, repo: &RepoName, sha: &str) -> Result<()> {
        self.reporter
            .report(
                repo,
                &self.context,
                sha,
                CommitState::Success,
                AUTHORIZED_DESCRIPTION,
                &self.listing_url,
            )
            .await
    }
}
