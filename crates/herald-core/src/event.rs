//! Source-control webhook payloads.

use serde::{Deserialize, Serialize};

use crate::RepoName;
use crate::pull_request::{PullRequest, User};

/// `pull_request` webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequest,
}

impl PullRequestEvent {
    /// Actions that (re)trigger builds.
    pub fn is_actionable(&self) -> bool {
        matches!(self.action.as_str(), "opened" | "reopened" | "synchronize")
    }

    pub fn base_repo(&self) -> Option<&RepoName> {
        self.pull_request.base.repo.as_ref().map(|r| &r.full_name)
    }
}

/// `pull_request_review` webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub action: String,
    pub review: Review,
    pub pull_request: ReviewedPullRequest,
    pub repository: Repository,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedPullRequest {
    pub number: u64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: RepoName,
}

/// Review body that asks for the CI to run again.
pub const RERUN_COMMAND: &str = "rerun ci";

impl ReviewEvent {
    /// A submitted review whose body is exactly the re-run command, ignoring case
    /// and surrounding whitespace.
    pub fn requests_rerun(&self) -> bool {
        self.action == "submitted"
            && self
                .review
                .body
                .as_deref()
                .is_some_and(|b| b.trim().eq_ignore_ascii_case(RERUN_COMMAND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(action: &str, body: Option<&str>) -> ReviewEvent {
        serde_json::from_value(serde_json::json!({
            "action": action,
            "review": {"state": "commented", "body": body, "user": {"login": "bob"}},
            "pull_request": {"number": 42, "url": "https://api.github.com/repos/example-org/example/pulls/42"},
            "repository": {"full_name": "example-org/example", "name": "example"}
        }))
        .unwrap()
    }

    #[test]
    fn test_rerun_matches_case_and_whitespace() {
        assert!(review("submitted", Some("  Rerun CI  ")).requests_rerun());
        assert!(review("submitted", Some("rerun ci")).requests_rerun());
        assert!(review("submitted", Some("\nRERUN ci\t")).requests_rerun());
    }

    #[test]
    fn test_rerun_rejects_other_bodies_and_actions() {
        assert!(!review("submitted", Some("please rerun ci")).requests_rerun());
        assert!(!review("submitted", None).requests_rerun());
        assert!(!review("edited", Some("rerun ci")).requests_rerun());
    }

    #[test]
    fn test_pull_request_actions() {
        let mut event: PullRequestEvent = serde_json::from_value(serde_json::json!({
            "action": "opened",
            "number": 42,
            "pull_request": {
                "number": 42,
                "user": {"login": "alice"},
                "head": {"ref": "feature", "sha": "abc", "repo": {"full_name": "alice/example"}},
                "base": {"ref": "main", "sha": "def", "repo": {"full_name": "example-org/example"}}
            }
        }))
        .unwrap();

        assert!(event.is_actionable());
        assert_eq!(event.base_repo().unwrap().to_string(), "example-org/example");

        for action in ["reopened", "synchronize"] {
            event.action = action.to_string();
            assert!(event.is_actionable());
        }
        for action in ["closed", "labeled", "edited"] {
            event.action = action.to_string();
            assert!(!event.is_actionable());
        }
    }
}
