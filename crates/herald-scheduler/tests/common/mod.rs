//! Shared fixtures for engine tests.

#![allow(dead_code)]

use std::sync::Arc;

use herald_core::event::{PullRequestEvent, Repository, Review, ReviewEvent, ReviewedPullRequest};
use herald_core::fakes::{CallLog, MemoryCiServer, MemorySourceControl, sample_repo};
use herald_core::notification::{CiBuild, CiBuildParameters, CiNotification};
use herald_core::pull_request::{PullRequest, User};
use herald_core::{BuildCatalog, BuildDefinition, CommitSelectionPolicy, InstanceQueryKind};
use herald_scheduler::{EngineSettings, OrchestrationEngine, RetryPolicy};

pub const UNAUTHORIZED_CONTEXT: &str = "herald/unauthorized";

pub struct Harness {
    pub log: CallLog,
    pub source: Arc<MemorySourceControl>,
    pub ci: Arc<MemoryCiServer>,
    pub engine: OrchestrationEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    pub fn with_policy(policy: CommitSelectionPolicy) -> Self {
        Self::with_settings(EngineSettings {
            policy,
            ..settings()
        })
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let log = CallLog::new();
        let source = Arc::new(MemorySourceControl::new(log.clone()).with_login("herald-bot"));
        source.add_team_member("core", "alice");
        let ci = Arc::new(MemoryCiServer::new(log.clone()));

        let engine = OrchestrationEngine::new(
            Arc::new(catalog()),
            source.clone(),
            ci.clone(),
            settings,
        );

        Self {
            log,
            source,
            ci,
            engine,
        }
    }
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        policy: CommitSelectionPolicy::Last,
        org: "example-org".to_string(),
        teams: vec!["core".to_string()],
        unauthorized_context: UNAUTHORIZED_CONTEXT.to_string(),
        listing_url: "https://github.com/example-org/example/pulls/".to_string(),
        web_url: "https://github.com".to_string(),
        comment_author: None,
        instance_query: InstanceQueryKind::Pr,
        retry: RetryPolicy::immediate(5),
    }
}

/// `pr-linux` and `pr-macos` run for every pull request; `pr-docs` follows a
/// successful `pr-linux` except on `release`; `nightly` only runs on request.
pub fn catalog() -> BuildCatalog {
    let repo = sample_repo();
    BuildCatalog::new(vec![
        BuildDefinition::new(repo.clone(), "pr-linux", "ci/linux")
            .with_downstream_contexts(["ci/docs"]),
        BuildDefinition::new(repo.clone(), "pr-macos", "ci/macos"),
        BuildDefinition::new(repo.clone(), "pr-docs", "ci/docs")
            .downstream(true)
            .with_exclude_targets(["release"]),
        BuildDefinition::new(repo, "nightly", "ci/nightly").custom(true),
    ])
    .unwrap()
}

pub fn pull_request_event(action: &str, pull_request: PullRequest) -> PullRequestEvent {
    PullRequestEvent {
        action: action.to_string(),
        number: pull_request.number,
        pull_request,
    }
}

pub fn review_event(reviewer: &str, body: &str, number: u64) -> ReviewEvent {
    ReviewEvent {
        action: "submitted".to_string(),
        review: Review {
            state: "commented".to_string(),
            body: Some(body.to_string()),
            user: User {
                login: reviewer.to_string(),
            },
        },
        pull_request: ReviewedPullRequest {
            number,
            url: format!("https://api.github.com/repos/example-org/example/pulls/{}", number),
        },
        repository: Repository {
            full_name: sample_repo(),
        },
    }
}

pub fn notification(
    job: &str,
    phase: &str,
    status: Option<&str>,
    base_branch: &str,
) -> CiNotification {
    CiNotification {
        name: job.to_string(),
        build: CiBuild {
            number: 7,
            full_url: format!("https://jenkins.example.org/job/{}/7/", job),
            phase: phase.to_string(),
            status: status.map(str::to_string),
            parameters: CiBuildParameters {
                base_repo: sample_repo(),
                head_repo: "contributor/example".parse().unwrap(),
                sha: "abc123".to_string(),
                pr: "4".to_string(),
                base_branch: base_branch.to_string(),
            },
        },
    }
}
