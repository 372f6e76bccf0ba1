//! Commit status states and the commit-selection policy.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Error;

/// State of a commit status as understood by the source-control system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    #[display("pending")]
    Pending,
    #[display("success")]
    Success,
    #[display("failure")]
    Failure,
    #[display("error")]
    Error,
}

/// Which commits of a pull request get statuses and builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum CommitSelectionPolicy {
    /// Every commit in the pull request.
    #[display("all")]
    All,
    /// Every commit without a status under the build's context yet.
    #[display("new")]
    New,
    /// Only the head commit.
    #[default]
    #[display("last")]
    Last,
}

impl std::str::FromStr for CommitSelectionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(CommitSelectionPolicy::All),
            "new" => Ok(CommitSelectionPolicy::New),
            "last" => Ok(CommitSelectionPolicy::Last),
            _ => Err(Error::InvalidInput(format!(
                "unknown commit selection policy: {}",
                s
            ))),
        }
    }
}
