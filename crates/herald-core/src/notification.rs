//! CI phase/status callbacks.
//!
//! Jenkins' notification plugin posts one of these per build phase.

use serde::{Deserialize, Serialize};

use crate::RepoName;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiNotification {
    /// Job name.
    pub name: String,
    pub build: CiBuild,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiBuild {
    pub number: u64,
    #[serde(default)]
    pub full_url: String,
    pub phase: String,
    #[serde(default)]
    pub status: Option<String>,
    pub parameters: CiBuildParameters,
}

/// Parameters the build was scheduled with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiBuildParameters {
    #[serde(rename = "GIT_BASE_REPO")]
    pub base_repo: RepoName,
    #[serde(rename = "GIT_HEAD_REPO")]
    pub head_repo: RepoName,
    #[serde(rename = "GIT_SHA1")]
    pub sha: String,
    #[serde(rename = "PR")]
    pub pr: String,
    #[serde(rename = "BASE_BRANCH", default)]
    pub base_branch: String,
}

/// Build phases the engine acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Started,
    Completed,
}

impl BuildPhase {
    pub fn parse(phase: &str) -> Option<Self> {
        match phase {
            "STARTED" => Some(BuildPhase::Started),
            "COMPLETED" => Some(BuildPhase::Completed),
            _ => None,
        }
    }
}

/// Terminal results reported with a `COMPLETED` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
}

impl BuildResult {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "SUCCESS" => Some(BuildResult::Success),
            "FAILURE" => Some(BuildResult::Failure),
            "UNSTABLE" => Some(BuildResult::Unstable),
            "ABORTED" => Some(BuildResult::Aborted),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_notification() {
        let json = r#"{
            "name": "pr-linux",
            "url": "job/pr-linux/",
            "build": {
                "full_url": "https://jenkins.example.org/job/pr-linux/7/",
                "number": 7,
                "phase": "COMPLETED",
                "status": "SUCCESS",
                "parameters": {
                    "GIT_BASE_REPO": "example-org/example",
                    "GIT_HEAD_REPO": "alice/example",
                    "GIT_SHA1": "abc123",
                    "GITHUB_URL": "https://github.com/example-org/example/pull/42",
                    "PR": "42",
                    "BASE_BRANCH": "main"
                }
            }
        }"#;

        let n: CiNotification = serde_json::from_str(json).unwrap();
        assert_eq!(n.name, "pr-linux");
        assert_eq!(BuildPhase::parse(&n.build.phase), Some(BuildPhase::Completed));
        assert_eq!(
            n.build.status.as_deref().and_then(BuildResult::parse),
            Some(BuildResult::Success)
        );
        assert_eq!(n.build.parameters.base_branch, "main");
        assert_eq!(n.build.parameters.head_repo.to_string(), "alice/example");
    }

    #[test]
    fn test_unknown_phase_and_status() {
        assert_eq!(BuildPhase::parse("FINALIZED"), None);
        assert_eq!(BuildResult::parse("WEIRD"), None);
    }
}
