//! CI system capability and build parameters.

use async_trait::async_trait;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Number of one concrete execution of a CI job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
#[display("{_0}")]
pub struct InstanceId(pub u64);

/// Which active instance of a job to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceQuery {
    /// Any unfinished build whose `PR` parameter matches.
    Pr { pr: u64 },
    /// An unfinished build whose `PR` and `GIT_SHA1` parameters both match.
    PrAndSha { pr: u64, sha: String },
}

impl InstanceQuery {
    pub fn pr(&self) -> u64 {
        match self {
            InstanceQuery::Pr { pr } | InstanceQuery::PrAndSha { pr, .. } => *pr,
        }
    }
}

/// Which query contract is used to find a pull request's active builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
pub enum InstanceQueryKind {
    #[default]
    #[display("pr")]
    Pr,
    #[display("pr-and-sha")]
    PrAndSha,
}

impl InstanceQueryKind {
    pub fn query(self, pr: u64, sha: &str) -> InstanceQuery {
        match self {
            InstanceQueryKind::Pr => InstanceQuery::Pr { pr },
            InstanceQueryKind::PrAndSha => InstanceQuery::PrAndSha {
                pr,
                sha: sha.to_string(),
            },
        }
    }
}

impl std::str::FromStr for InstanceQueryKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pr" => Ok(InstanceQueryKind::Pr),
            "pr-and-sha" => Ok(InstanceQueryKind::PrAndSha),
            _ => Err(crate::Error::InvalidInput(format!(
                "unknown instance query: {}",
                s
            ))),
        }
    }
}

/// Ordered build parameters, encoded as `KEY=value&KEY=value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildParameters(Vec<(String, String)>);

impl BuildParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, replacing an earlier value for the same key in place.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_query(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Operations the engine needs from the CI system.
#[async_trait]
pub trait CiServer: Send + Sync {
    /// Requests a parameterized build of `job`.
    async fn trigger_build(&self, job: &str, parameters: &BuildParameters) -> Result<()>;

    /// Finds a queued or running instance of `job` matching `query`.
    ///
    /// An error means the state is unknown, not that no instance exists.
    async fn find_active_instance(
        &self,
        job: &str,
        query: &InstanceQuery,
    ) -> Result<Option<InstanceId>>;

    /// Stops an instance. Stopping a finished instance succeeds.
    async fn stop_instance(&self, job: &str, id: InstanceId) -> Result<()>;

    /// Human-facing URL of a job, used as a status target.
    fn job_url(&self, job: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_keeps_order_and_encodes_values() {
        let params = BuildParameters::new()
            .set("GIT_BASE_REPO", "example-org/example")
            .set("GIT_SHA1", "abc123")
            .set("GITHUB_URL", "https://github.com/example-org/example/pull/4")
            .set("PR", "4");

        assert_eq!(
            params.to_query(),
            "GIT_BASE_REPO=example-org%2Fexample&GIT_SHA1=abc123\
             &GITHUB_URL=https%3A%2F%2Fgithub.com%2Fexample-org%2Fexample%2Fpull%2F4&PR=4"
        );
    }

    #[test]
    fn test_instance_query_kind() {
        assert_eq!(
            "pr".parse::<InstanceQueryKind>().unwrap().query(4, "abc"),
            InstanceQuery::Pr { pr: 4 }
        );
        assert_eq!(
            "pr-and-sha".parse::<InstanceQueryKind>().unwrap().query(4, "abc"),
            InstanceQuery::PrAndSha {
                pr: 4,
                sha: "abc".to_string()
            }
        );
        assert!("sha".parse::<InstanceQueryKind>().is_err());
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let params = BuildParameters::new().set("PR", "1").set("SHA", "a").set("PR", "2");
        assert_eq!(params.get("PR"), Some("2"));
        assert_eq!(params.iter().count(), 2);
        assert_eq!(params.to_query(), "PR=2&SHA=a");
    }
}
