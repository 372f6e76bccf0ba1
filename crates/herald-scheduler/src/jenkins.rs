//! Scheduling and cancelling CI builds.

use std::sync::Arc;

use herald_core::{BuildParameters, CiServer, InstanceId, InstanceQueryKind, Result};
use tracing::info;

pub struct JenkinsScheduler {
    ci: Arc<dyn CiServer>,
    instance_query: InstanceQueryKind,
}

impl JenkinsScheduler {
    pub fn new(ci: Arc<dyn CiServer>, instance_query: InstanceQueryKind) -> Self {
        Self { ci, instance_query }
    }

    pub async fn schedule(&self, job: &str, parameters: &BuildParameters) -> Result<()> {
        self.ci.trigger_build(job, parameters).await?;
        info!(
            job,
            pr = parameters.get("PR").unwrap_or_default(),
            sha = parameters.get("GIT_SHA1").unwrap_or_default(),
            "Scheduled build"
        );
        Ok(())
    }

    pub fn instance_query(&self) -> InstanceQueryKind {
        self.instance_query
    }

    /// Active instance of `job` for pull request `pr` at `sha`, if any.
    pub async fn find_active(&self, job: &str, pr: u64, sha: &str) -> Result<Option<InstanceId>> {
        let query = self.instance_query.query(pr, sha);
        self.ci.find_active_instance(job, &query).await
    }

    /// Stops the active instance of `job` for the pull request, if there is one.
    /// Returns whether a stop was issued.
    pub async fn cancel_existing(&self, job: &str, pr: u64, sha: &str) -> Result<bool> {
        let Some(id) = self.find_active(job, pr, sha).await? else {
            return Ok(false);
        };

        self.ci.stop_instance(job, id).await?;
        info!(job, pr, instance = %id, "Cancelled build");
        Ok(true)
    }

    pub fn job_url(&self, job: &str) -> String {
        self.ci.job_url(job)
    }
}
