//! Orchestration engine - reacts to pull request, review and CI events.

use std::sync::Arc;

use herald_config::ServiceConfig;
use herald_core::event::{PullRequestEvent, ReviewEvent};
use herald_core::notification::{BuildPhase, BuildResult, CiNotification};
use herald_core::pull_request::{LoadedPullRequest, PullRequest, PullRequestContent};
use herald_core::{
    BuildCatalog, BuildDefinition, BuildParameters, CiServer, CommitSelectionPolicy, CommitState,
    Error, InstanceQueryKind, RepoName, Result, SourceControl,
};
use tracing::{debug, error, info, warn};

use crate::authorization::AuthorizationGate;
use crate::jenkins::JenkinsScheduler;
use crate::reporter::StatusReporter;
use crate::resolver::CommitResolver;
use crate::retry::RetryPolicy;

const PENDING_DESCRIPTION: &str = "Jenkins build is being scheduled";
const OPEN_PULL_REQUEST_PAGE_SIZE: u32 = 100;

/// Settings the engine takes from the service configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub policy: CommitSelectionPolicy,
    pub org: String,
    pub teams: Vec<String>,
    pub unauthorized_context: String,
    /// Target of the unauthorized status.
    pub listing_url: String,
    /// Web root used to build pull request links, without a trailing slash.
    pub web_url: String,
    pub comment_author: Option<String>,
    pub instance_query: InstanceQueryKind,
    pub retry: RetryPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            policy: config.server.build_commits,
            org: config.github.org.clone(),
            teams: config.github.teams.clone(),
            unauthorized_context: config.github.unauthorized_context.clone(),
            listing_url: config.github.pull_request_listing_url(),
            web_url: config.github.web_url.as_str().trim_end_matches('/').to_string(),
            comment_author: config.github.user.clone(),
            instance_query: config.jenkins.instance_query,
            retry: RetryPolicy::default(),
        }
    }
}

/// What happened to a pull request event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestOutcome {
    /// The action does not trigger builds.
    Ignored,
    /// No build is configured for the repository.
    NotConfigured,
    NotMergeable,
    /// The author is not authorized; the pull request was marked and notified.
    Rejected,
    Scheduled { builds: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Phase the engine does not act on.
    Ignored,
    /// Unknown status or job; logged and dropped.
    Dropped,
    Reported { state: CommitState, downstream: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Not a submitted re-run request.
    Ignored,
    /// The reviewer may not re-run builds.
    Forbidden,
    /// No build is configured for the repository.
    NotConfigured,
    Scheduled { builds: usize },
}

pub struct OrchestrationEngine {
    catalog: Arc<BuildCatalog>,
    source: Arc<dyn SourceControl>,
    resolver: CommitResolver,
    reporter: StatusReporter,
    gate: AuthorizationGate,
    scheduler: JenkinsScheduler,
    policy: CommitSelectionPolicy,
    web_url: String,
    retry: RetryPolicy,
}

impl OrchestrationEngine {
    pub fn new(
        catalog: Arc<BuildCatalog>,
        source: Arc<dyn SourceControl>,
        ci: Arc<dyn CiServer>,
        settings: EngineSettings,
    ) -> Self {
        let gate = AuthorizationGate::new(
            source.clone(),
            settings.org,
            settings.teams,
            settings.unauthorized_context,
            settings.listing_url,
        )
        .with_comment_author(settings.comment_author);

        Self {
            resolver: CommitResolver::new(source.clone()),
            reporter: StatusReporter::new(source.clone()),
            scheduler: JenkinsScheduler::new(ci, settings.instance_query),
            gate,
            catalog,
            source,
            policy: settings.policy,
            web_url: settings.web_url,
            retry: settings.retry,
        }
    }

    pub fn catalog(&self) -> &BuildCatalog {
        &self.catalog
    }

    /// Handles an opened, reopened or synchronized pull request.
    pub async fn on_pull_request_event(
        &self,
        event: &PullRequestEvent,
    ) -> Result<PullRequestOutcome> {
        if !event.is_actionable() {
            debug!(action = %event.action, pr = event.number, "Ignoring pull request action");
            return Ok(PullRequestOutcome::Ignored);
        }

        let repo = event
            .base_repo()
            .cloned()
            .ok_or_else(|| Error::InvalidInput("pull request has no base repository".to_string()))?;
        info!(%repo, pr = event.number, action = %event.action, "Handling pull request event");

        let loaded = self.load_pull_request(&repo, event.number).await?;
        if !self.is_mergeable(&loaded).await? {
            warn!(%repo, pr = event.number, "Pull request is not mergeable, skipping");
            return Ok(PullRequestOutcome::NotMergeable);
        }

        let author = &loaded.pull_request.user.login;
        if !self.gate.is_authorized(author).await? {
            warn!(%repo, pr = event.number, user = %author, "Pull request author is not authorized");
            let rejected = self.gate.reject_and_notify(&loaded).await;
            let cancelled = self.cancel_builds(&repo, &loaded.pull_request).await;
            rejected?;
            return match cancelled {
                Ok(_) => Ok(PullRequestOutcome::Rejected),
                Err(Error::NotInCatalog(msg)) => {
                    debug!(%repo, "{}", msg);
                    Ok(PullRequestOutcome::Rejected)
                }
                Err(e) => Err(e),
            };
        }

        match self.restart_builds(&repo, &loaded.pull_request).await {
            Ok(builds) => Ok(PullRequestOutcome::Scheduled { builds }),
            Err(Error::NotInCatalog(msg)) => {
                warn!(%repo, pr = event.number, "{}", msg);
                Ok(PullRequestOutcome::NotConfigured)
            }
            Err(e) => Err(e),
        }
    }

    /// Mirrors a CI phase change onto the commit and chains downstream builds on success.
    pub async fn on_ci_notification(
        &self,
        notification: &CiNotification,
    ) -> Result<NotificationOutcome> {
        let build = &notification.build;
        let Some(phase) = BuildPhase::parse(&build.phase) else {
            debug!(job = %notification.name, phase = %build.phase, "Ignoring build phase");
            return Ok(NotificationOutcome::Ignored);
        };

        let Some((state, verb)) = ci_state(phase, build.status.as_deref()) else {
            error!(
                job = %notification.name,
                status = build.status.as_deref().unwrap_or_default(),
                "Did not understand build status"
            );
            return Ok(NotificationOutcome::Dropped);
        };

        let definition = match self.catalog.find_by_job(&notification.name) {
            Ok(definition) => definition,
            Err(e) => {
                error!(job = %notification.name, error = %e, "Dropping notification");
                return Ok(NotificationOutcome::Dropped);
            }
        };

        let params = &build.parameters;
        let description = format!("Jenkins build {} {} {}", notification.name, build.number, verb);
        let target_url = if state == CommitState::Pending {
            format!("{}console", build.full_url)
        } else {
            build.full_url.clone()
        };
        self.reporter
            .report(
                &params.base_repo,
                &definition.context,
                &params.sha,
                state,
                &description,
                &target_url,
            )
            .await?;

        if state != CommitState::Success {
            return Ok(NotificationOutcome::Reported { state, downstream: 0 });
        }

        let mut downstream = 0;
        for context in &definition.downstream_contexts {
            let next = match self.catalog.find_by_context_and_repo(context, &params.base_repo) {
                Ok(next) => next,
                Err(e) => {
                    error!(
                        job = %notification.name,
                        context = %context,
                        error = %e,
                        "Downstream build not found"
                    );
                    break;
                }
            };

            if next.excludes(&params.base_branch) {
                info!(
                    job = %next.job,
                    base_branch = %params.base_branch,
                    "Skipping downstream build for excluded target"
                );
                continue;
            }

            let parameters = BuildParameters::new()
                .set("GIT_BASE_REPO", params.base_repo.to_string())
                .set("GIT_HEAD_REPO", params.head_repo.to_string())
                .set("GIT_SHA1", params.sha.as_str())
                .set(
                    "GITHUB_URL",
                    format!("{}/{}/pull/{}", self.web_url, params.base_repo, params.pr),
                )
                .set("PR", params.pr.as_str())
                .set("BASE_BRANCH", params.base_branch.as_str());
            self.schedule(&params.base_repo, next, &params.sha, &parameters).await?;
            downstream += 1;
        }

        Ok(NotificationOutcome::Reported { state, downstream })
    }

    /// Re-runs builds when an authorized reviewer submits the re-run command.
    pub async fn on_review(&self, event: &ReviewEvent) -> Result<ReviewOutcome> {
        if !event.requests_rerun() {
            debug!(
                action = %event.action,
                pr = event.pull_request.number,
                "Review is not a re-run request"
            );
            return Ok(ReviewOutcome::Ignored);
        }

        let reviewer = &event.review.user.login;
        if !self.gate.is_authorized(reviewer).await? {
            warn!(pr = event.pull_request.number, user = %reviewer, "Reviewer may not re-run builds");
            return Ok(ReviewOutcome::Forbidden);
        }

        let repo = &event.repository.full_name;
        let number = event.pull_request.number;
        if let Err(e) = self.catalog.find_by_repo(repo, false) {
            warn!(%repo, pr = number, error = %e, "Dropping re-run request");
            return Ok(ReviewOutcome::NotConfigured);
        }
        info!(%repo, pr = number, user = %reviewer, "Re-running builds on request");

        let pull_request = self.source.fetch_pull_request(repo, number).await?;
        self.gate.clear_rejection(repo, &pull_request.head.sha).await?;

        let builds = self.restart_builds(repo, &pull_request).await?;
        Ok(ReviewOutcome::Scheduled { builds })
    }

    /// Schedules the build behind `context` for one pull request. Returns the
    /// number of commits scheduled.
    pub async fn on_custom_build(
        &self,
        repo: &RepoName,
        context: &str,
        number: u64,
    ) -> Result<usize> {
        let definition = self.catalog.find_by_context_and_repo(context, repo)?;
        let pull_request = self.source.fetch_pull_request(repo, number).await?;
        info!(%repo, pr = number, job = %definition.job, "Scheduling requested build");
        self.schedule_pull_request(repo, definition, &pull_request).await
    }

    /// Schedules the build behind `context` for every open pull request whose
    /// head has neither that status nor the unauthorized one. Returns the
    /// number of pull requests scheduled.
    pub async fn on_cron_build(&self, repo: &RepoName, context: &str) -> Result<usize> {
        let definition = self.catalog.find_by_context_and_repo(context, repo)?;
        let open = self
            .source
            .list_pull_requests(repo, "open", OPEN_PULL_REQUEST_PAGE_SIZE)
            .await?;

        let mut scheduled = 0;
        for pull_request in &open {
            let sha = &pull_request.head.sha;
            if self.resolver.has_status(repo, sha, &definition.context).await
                || self.resolver.has_status(repo, sha, self.gate.context()).await
            {
                continue;
            }

            match self.schedule_pull_request(repo, definition, pull_request).await {
                Ok(_) => scheduled += 1,
                Err(e) => {
                    error!(%repo, pr = pull_request.number, error = %e, "Failed to schedule build");
                }
            }
        }

        info!(
            %repo,
            context = %definition.context,
            open = open.len(),
            scheduled,
            "Scanned open pull requests"
        );
        Ok(scheduled)
    }

    /// Loads the pull request and its content, retrying while it is not yet visible.
    async fn load_pull_request(&self, repo: &RepoName, number: u64) -> Result<LoadedPullRequest> {
        self.retry
            .run(
                move || async move {
                    let pull_request = self.source.fetch_pull_request(repo, number).await?;
                    let content = PullRequestContent {
                        commits: self.source.list_commits(repo, number).await?,
                        files: self.source.list_files(repo, number).await?,
                        comments: self.source.list_comments(repo, number).await?,
                    };
                    Ok::<_, Error>(LoadedPullRequest {
                        repo: repo.clone(),
                        pull_request,
                        content,
                    })
                },
                Error::is_not_found,
            )
            .await
            .map_err(|e| {
                Error::Internal(format!(
                    "failed to load pull request {}#{}: {}",
                    repo, number, e
                ))
            })
    }

    /// Mergeability is computed lazily upstream; an unknown value is fetched once more.
    async fn is_mergeable(&self, loaded: &LoadedPullRequest) -> Result<bool> {
        if let Some(mergeable) = loaded.pull_request.mergeable {
            return Ok(mergeable);
        }

        let refreshed = self
            .source
            .fetch_pull_request(&loaded.repo, loaded.pull_request.number)
            .await?;
        Ok(refreshed.mergeable.unwrap_or(false))
    }

    /// Cancels every active build of the pull request, then schedules the
    /// repository's non-downstream builds.
    async fn restart_builds(&self, repo: &RepoName, pull_request: &PullRequest) -> Result<usize> {
        let definitions = self.cancel_builds(repo, pull_request).await?;

        let mut scheduled = 0;
        for definition in definitions.into_iter().filter(|d| !d.downstream) {
            scheduled += self.schedule_pull_request(repo, definition, pull_request).await?;
        }
        Ok(scheduled)
    }

    async fn cancel_builds(
        &self,
        repo: &RepoName,
        pull_request: &PullRequest,
    ) -> Result<Vec<&BuildDefinition>> {
        let definitions = self.catalog.find_by_repo(repo, false)?;
        let shas = self.cancellable_shas(repo, pull_request).await?;
        for definition in &definitions {
            for sha in &shas {
                self.scheduler
                    .cancel_existing(&definition.job, pull_request.number, sha)
                    .await?;
            }
        }
        Ok(definitions)
    }

    /// Shas a running build of the pull request may have been started with.
    ///
    /// A sha-keyed query only finds builds of the exact commit, and a stale
    /// build usually runs an older one, so every commit is checked.
    async fn cancellable_shas(
        &self,
        repo: &RepoName,
        pull_request: &PullRequest,
    ) -> Result<Vec<String>> {
        let head = &pull_request.head.sha;
        match self.scheduler.instance_query() {
            InstanceQueryKind::Pr => Ok(vec![head.clone()]),
            InstanceQueryKind::PrAndSha => {
                let mut shas: Vec<String> = self
                    .source
                    .list_commits(repo, pull_request.number)
                    .await?
                    .into_iter()
                    .map(|c| c.sha)
                    .collect();
                if !shas.contains(head) {
                    shas.push(head.clone());
                }
                Ok(shas)
            }
        }
    }

    async fn schedule_pull_request(
        &self,
        repo: &RepoName,
        definition: &BuildDefinition,
        pull_request: &PullRequest,
    ) -> Result<usize> {
        let shas = self
            .resolver
            .resolve(self.policy, repo, pull_request, &definition.context)
            .await?;

        let head_repo = pull_request.head_repo().unwrap_or(repo);
        let github_url = if pull_request.html_url.is_empty() {
            format!("{}/{}/pull/{}", self.web_url, repo, pull_request.number)
        } else {
            pull_request.html_url.clone()
        };

        for sha in &shas {
            let parameters = BuildParameters::new()
                .set("GIT_BASE_REPO", repo.to_string())
                .set("GIT_HEAD_REPO", head_repo.to_string())
                .set("GIT_SHA1", sha.as_str())
                .set("GITHUB_URL", github_url.as_str())
                .set("PR", pull_request.number.to_string())
                .set("BASE_BRANCH", pull_request.base.ref_name.as_str());
            self.schedule(repo, definition, sha, &parameters).await?;
        }
        Ok(shas.len())
    }

    /// Writes the pending status, then asks the CI system for the build.
    async fn schedule(
        &self,
        repo: &RepoName,
        definition: &BuildDefinition,
        sha: &str,
        parameters: &BuildParameters,
    ) -> Result<()> {
        self.reporter
            .report(
                repo,
                &definition.context,
                sha,
                CommitState::Pending,
                PENDING_DESCRIPTION,
                &self.scheduler.job_url(&definition.job),
            )
            .await?;
        self.scheduler.schedule(&definition.job, parameters).await
    }
}

/// Commit state and description verb for a CI phase and status.
fn ci_state(phase: BuildPhase, status: Option<&str>) -> Option<(CommitState, &'static str)> {
    match phase {
        BuildPhase::Started => Some((CommitState::Pending, "is running")),
        BuildPhase::Completed => match BuildResult::parse(status?)? {
            BuildResult::Success => Some((CommitState::Success, "has succeeded")),
            BuildResult::Failure => Some((CommitState::Failure, "has failed")),
            BuildResult::Unstable => Some((CommitState::Failure, "was unstable")),
            BuildResult::Aborted => Some((CommitState::Error, "has encountered an error")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_state_mapping() {
        assert_eq!(
            ci_state(BuildPhase::Started, None),
            Some((CommitState::Pending, "is running"))
        );
        assert_eq!(
            ci_state(BuildPhase::Started, Some("SUCCESS")).map(|s| s.0),
            Some(CommitState::Pending)
        );
        assert_eq!(
            ci_state(BuildPhase::Completed, Some("SUCCESS")).map(|s| s.0),
            Some(CommitState::Success)
        );
        assert_eq!(
            ci_state(BuildPhase::Completed, Some("FAILURE")).map(|s| s.0),
            Some(CommitState::Failure)
        );
        assert_eq!(
            ci_state(BuildPhase::Completed, Some("UNSTABLE")),
            Some((CommitState::Failure, "was unstable"))
        );
        assert_eq!(
            ci_state(BuildPhase::Completed, Some("ABORTED")).map(|s| s.0),
            Some(CommitState::Error)
        );
    }

    #[test]
    fn test_ci_state_unknown_status() {
        assert_eq!(ci_state(BuildPhase::Completed, Some("NOT_BUILT")), None);
        assert_eq!(ci_state(BuildPhase::Completed, None), None);
    }
}
