//! In-memory fakes for the capability traits (testing only).
//!
//! `MemorySourceControl` and `MemoryCiServer` share a [`CallLog`] so tests
//! can assert on the order of calls across both systems. The source-control
//! fake holds a single repository; pull requests are keyed by number.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ci::{BuildParameters, CiServer, InstanceId, InstanceQuery};
use crate::pull_request::{
    ChangedFile, Comment, Commit, CommitStatus, GitRef, PullRequest, RepoRef, User,
};
use crate::source_control::SourceControl;
use crate::{CommitState, Error, RepoName, Result};

/// Base repository used by [`sample_pull_request`].
pub fn sample_repo() -> RepoName {
    RepoName::new("example-org", "example")
}

/// One call made against a fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchPullRequest { number: u64 },
    ListCommits { number: u64 },
    ListFiles { number: u64 },
    ListComments { number: u64 },
    ListStatuses { sha: String },
    SetStatus { sha: String, status: CommitStatus },
    AddComment { number: u64, body: String },
    ListPullRequests { state: String },
    IsTeamMember { team: String, user: String },
    TriggerBuild { job: String, parameters: BuildParameters },
    FindActiveInstance { job: String, query: InstanceQuery },
    StopInstance { job: String, id: InstanceId },
}

impl Call {
    /// Whether the call changes state in the remote system.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::SetStatus { .. }
                | Call::AddComment { .. }
                | Call::TriggerBuild { .. }
                | Call::StopInstance { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Statuses written, in order.
    pub fn statuses(&self) -> Vec<(String, CommitStatus)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SetStatus { sha, status } => Some((sha, status)),
                _ => None,
            })
            .collect()
    }

    /// Builds triggered, in order.
    pub fn triggers(&self) -> Vec<(String, BuildParameters)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::TriggerBuild { job, parameters } => Some((job, parameters)),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> Vec<(String, InstanceId)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::StopInstance { job, id } => Some((job, id)),
                _ => None,
            })
            .collect()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddComment { number, body } => Some((number, body)),
                _ => None,
            })
            .collect()
    }
}

/// A mergeable pull request from `login` against `main` of [`sample_repo`].
pub fn sample_pull_request(number: u64, login: &str, head_sha: &str) -> PullRequest {
    let repo = || {
        Some(RepoRef {
            full_name: sample_repo(),
        })
    };
    PullRequest {
        number,
        html_url: format!("https://github.com/{}/pull/{}", sample_repo(), number),
        user: User {
            login: login.to_string(),
        },
        head: GitRef {
            ref_name: "feature".to_string(),
            sha: head_sha.to_string(),
            repo: repo(),
        },
        base: GitRef {
            ref_name: "main".to_string(),
            sha: "base000".to_string(),
            repo: repo(),
        },
        mergeable: Some(true),
    }
}

#[derive(Debug, Default)]
struct SourceState {
    pull_requests: HashMap<u64, PullRequest>,
    commits: HashMap<u64, Vec<Commit>>,
    files: HashMap<u64, Vec<ChangedFile>>,
    comments: HashMap<u64, Vec<Comment>>,
    statuses: HashMap<String, Vec<CommitStatus>>,
    teams: HashMap<String, HashSet<String>>,
    missing_fetches: u32,
    failing_status_lookups: bool,
}

/// In-memory source-control system.
#[derive(Debug, Default)]
pub struct MemorySourceControl {
    state: Mutex<SourceState>,
    log: CallLog,
    login: Option<String>,
}

impl MemorySourceControl {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Stores a pull request with its commits, oldest first.
    pub fn add_pull_request(&self, pull_request: PullRequest, commits: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.commits.insert(
            pull_request.number,
            commits
                .iter()
                .map(|sha| Commit {
                    sha: sha.to_string(),
                })
                .collect(),
        );
        state.pull_requests.insert(pull_request.number, pull_request);
    }

    pub fn add_status(&self, sha: &str, context: &str, state: CommitState) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(CommitStatus {
                state,
                context: context.to_string(),
                description: None,
                target_url: None,
            });
    }

    pub fn add_team_member(&self, team: &str, user: &str) {
        self.state
            .lock()
            .unwrap()
            .teams
            .entry(team.to_string())
            .or_default()
            .insert(user.to_string());
    }

    /// The next `count` pull request fetches answer not-found.
    pub fn fail_next_fetches(&self, count: u32) {
        self.state.lock().unwrap().missing_fetches = count;
    }

    pub fn fail_status_lookups(&self) {
        self.state.lock().unwrap().failing_status_lookups = true;
    }

    pub fn comments(&self, number: u64) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceControl for MemorySourceControl {
    async fn fetch_pull_request(&self, _repo: &RepoName, number: u64) -> Result<PullRequest> {
        self.log.record(Call::FetchPullRequest { number });
        let mut state = self.state.lock().unwrap();
        if state.missing_fetches > 0 {
            state.missing_fetches -= 1;
            return Err(Error::NotFound(format!("pull request {}", number)));
        }
        state
            .pull_requests
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("pull request {}", number)))
    }

    async fn list_commits(&self, _repo: &RepoName, number: u64) -> Result<Vec<Commit>> {
        self.log.record(Call::ListCommits { number });
        let state = self.state.lock().unwrap();
        Ok(state.commits.get(&number).cloned().unwrap_or_default())
    }

    async fn list_files(&self, _repo: &RepoName, number: u64) -> Result<Vec<ChangedFile>> {
        self.log.record(Call::ListFiles { number });
        let state = self.state.lock().unwrap();
        Ok(state.files.get(&number).cloned().unwrap_or_default())
    }

    async fn list_comments(&self, _repo: &RepoName, number: u64) -> Result<Vec<Comment>> {
        self.log.record(Call::ListComments { number });
        let state = self.state.lock().unwrap();
        Ok(state.comments.get(&number).cloned().unwrap_or_default())
    }

    async fn list_statuses(&self, _repo: &RepoName, sha: &str) -> Result<Vec<CommitStatus>> {
        self.log.record(Call::ListStatuses {
            sha: sha.to_string(),
        });
        let state = self.state.lock().unwrap();
        if state.failing_status_lookups {
            return Err(Error::Upstream("status lookup failed".to_string()));
        }
        Ok(state.statuses.get(sha).cloned().unwrap_or_default())
    }

    async fn set_status(&self, _repo: &RepoName, sha: &str, status: &CommitStatus) -> Result<()> {
        self.log.record(Call::SetStatus {
            sha: sha.to_string(),
            status: status.clone(),
        });
        self.state
            .lock()
            .unwrap()
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(status.clone());
        Ok(())
    }

    async fn add_comment(&self, _repo: &RepoName, number: u64, body: &str) -> Result<()> {
        self.log.record(Call::AddComment {
            number,
            body: body.to_string(),
        });
        let login = self.login.clone().unwrap_or_else(|| "herald".to_string());
        self.state
            .lock()
            .unwrap()
            .comments
            .entry(number)
            .or_default()
            .push(Comment {
                user: User { login },
                body: body.to_string(),
            });
        Ok(())
    }

    async fn list_pull_requests(
        &self,
        _repo: &RepoName,
        state: &str,
        page_size: u32,
    ) -> Result<Vec<PullRequest>> {
        self.log.record(Call::ListPullRequests {
            state: state.to_string(),
        });
        let mut pull_requests: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .pull_requests
            .values()
            .cloned()
            .collect();
        pull_requests.sort_by_key(|pr| pr.number);
        pull_requests.truncate(page_size as usize);
        Ok(pull_requests)
    }

    async fn is_team_member(&self, _org: &str, team: &str, user: &str) -> Result<bool> {
        self.log.record(Call::IsTeamMember {
            team: team.to_string(),
            user: user.to_string(),
        });
        let state = self.state.lock().unwrap();
        Ok(state.teams.get(team).is_some_and(|members| members.contains(user)))
    }

    fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }
}

#[derive(Debug)]
struct ActiveBuild {
    job: String,
    pr: u64,
    /// `None` matches any sha.
    sha: Option<String>,
    id: InstanceId,
}

impl ActiveBuild {
    fn matches(&self, job: &str, query: &InstanceQuery) -> bool {
        if self.job != job || self.pr != query.pr() {
            return false;
        }
        match (query, &self.sha) {
            (InstanceQuery::PrAndSha { sha, .. }, Some(built)) => sha == built,
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
struct CiState {
    active: Vec<ActiveBuild>,
    failing_jobs: HashSet<String>,
}

/// In-memory CI system.
#[derive(Debug, Default)]
pub struct MemoryCiServer {
    state: Mutex<CiState>,
    log: CallLog,
}

impl MemoryCiServer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// Marks instance `id` of `job` as running for pull request `pr`, at any sha.
    pub fn add_active(&self, job: &str, pr: u64, id: u64) {
        self.insert_active(job, pr, None, id);
    }

    /// Marks instance `id` of `job` as running for pull request `pr` at `sha`.
    pub fn add_active_at(&self, job: &str, pr: u64, sha: &str, id: u64) {
        self.insert_active(job, pr, Some(sha.to_string()), id);
    }

    fn insert_active(&self, job: &str, pr: u64, sha: Option<String>, id: u64) {
        self.state.lock().unwrap().active.push(ActiveBuild {
            job: job.to_string(),
            pr,
            sha,
            id: InstanceId(id),
        });
    }

    /// Triggers of `job` answer with a server error.
    pub fn fail_job(&self, job: &str) {
        self.state.lock().unwrap().failing_jobs.insert(job.to_string());
    }
}

#[async_trait]
impl CiServer for MemoryCiServer {
    async fn trigger_build(&self, job: &str, parameters: &BuildParameters) -> Result<()> {
        self.log.record(Call::TriggerBuild {
            job: job.to_string(),
            parameters: parameters.clone(),
        });
        if self.state.lock().unwrap().failing_jobs.contains(job) {
            return Err(Error::Scheduling {
                code: 500,
                url: format!("{}buildWithParameters", self.job_url(job)),
            });
        }
        Ok(())
    }

    async fn find_active_instance(
        &self,
        job: &str,
        query: &InstanceQuery,
    ) -> Result<Option<InstanceId>> {
        self.log.record(Call::FindActiveInstance {
            job: job.to_string(),
            query: query.clone(),
        });
        let state = self.state.lock().unwrap();
        Ok(state
            .active
            .iter()
            .find(|active| active.matches(job, query))
            .map(|active| active.id))
    }

    async fn stop_instance(&self, job: &str, id: InstanceId) -> Result<()> {
        self.log.record(Call::StopInstance {
            job: job.to_string(),
            id,
        });
        self.state
            .lock()
            .unwrap()
            .active
            .retain(|active| !(active.job == job && active.id == id));
        Ok(())
    }

    fn job_url(&self, job: &str) -> String {
        format!("https://jenkins.example.org/job/{}/", job)
    }
}
