//! Jenkins remote access API client.

use std::time::Duration;

use async_trait::async_trait;
use herald_core::{BuildParameters, CiServer, InstanceId, InstanceQuery, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{JenkinsError, Operation};

/// Tree filter sent with every active-instance query.
const BUILD_TREE: &str = "builds[number,result,actions[parameters[name,value]]]";

/// Jenkins client authenticating with a user API token.
#[derive(Debug, Clone)]
pub struct JenkinsClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    token: String,
    query_status: u16,
}

impl JenkinsClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            token: token.into(),
            query_status: 200,
        }
    }

    /// Bound every request by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> std::result::Result<Self, JenkinsError> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Status code the active-instance query answers with on success.
    pub fn with_query_status(mut self, code: u16) -> Self {
        self.query_status = code;
        self
    }

    async fn build_with_parameters(
        &self,
        job: &str,
        parameters: &BuildParameters,
    ) -> std::result::Result<(), JenkinsError> {
        let url = format!(
            "{}/job/{}/buildWithParameters?{}",
            self.base_url,
            job,
            parameters.to_query()
        );
        debug!(url = %url, "Scheduling Jenkins build");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await?;

        let code = response.status().as_u16();
        if code != 201 {
            return Err(JenkinsError::Status {
                operation: Operation::Trigger,
                code,
                url,
            });
        }
        Ok(())
    }

    async fn query_instance(
        &self,
        job: &str,
        query: &InstanceQuery,
    ) -> std::result::Result<Option<InstanceId>, JenkinsError> {
        let url = format!("{}/job/{}/api/xml", self.base_url, job);
        let xpath = instance_xpath(query);
        debug!(url = %url, xpath = %xpath, "Querying active Jenkins build");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.token))
            .query(&[
                ("tree", BUILD_TREE),
                ("xpath", xpath.as_str()),
                ("wrapper", "found_jobs"),
            ])
            .send()
            .await?;

        let code = response.status().as_u16();
        if code != self.query_status {
            return Err(JenkinsError::Status {
                operation: Operation::Query,
                code,
                url,
            });
        }

        let body = response.text().await?;
        parse_found_jobs(&body)
    }

    async fn stop(&self, job: &str, id: InstanceId) -> std::result::Result<(), JenkinsError> {
        info!(job = %job, instance = %id, "Cancelling Jenkins build");

        let url = format!("{}/job/{}/{}/stop", self.base_url, job, id);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await?;

        let code = response.status().as_u16();
        if code != 200 && code != 201 {
            return Err(JenkinsError::Status {
                operation: Operation::Stop,
                code,
                url,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CiServer for JenkinsClient {
    async fn trigger_build(&self, job: &str, parameters: &BuildParameters) -> Result<()> {
        Ok(self.build_with_parameters(job, parameters).await?)
    }

    async fn find_active_instance(
        &self,
        job: &str,
        query: &InstanceQuery,
    ) -> Result<Option<InstanceId>> {
        Ok(self.query_instance(job, query).await?)
    }

    async fn stop_instance(&self, job: &str, id: InstanceId) -> Result<()> {
        Ok(self.stop(job, id).await?)
    }

    fn job_url(&self, job: &str) -> String {
        format!("{}/job/{}", self.base_url, job)
    }
}

/// XPath selecting unfinished builds that match `query`.
fn instance_xpath(query: &InstanceQuery) -> String {
    match query {
        InstanceQuery::Pr { pr } => format!(
            r#"/*/build[action/parameter[name="PR"][value="{}"]][not(result)]"#,
            pr
        ),
        InstanceQuery::PrAndSha { pr, sha } => format!(
            r#"/*/build[action/parameter[name="PR"][value="{}"]][action/parameter[name="GIT_SHA1"][value="{}"]][not(result)]"#,
            pr, sha
        ),
    }
}

#[derive(Debug, Deserialize)]
struct FoundJobs {
    #[serde(rename = "build", default)]
    builds: Vec<FoundBuild>,
}

#[derive(Debug, Deserialize)]
struct FoundBuild {
    #[serde(default)]
    number: u64,
}

/// First build number in a `found_jobs` wrapper; 0 or no build means none.
fn parse_found_jobs(body: &str) -> std::result::Result<Option<InstanceId>, JenkinsError> {
    let found: FoundJobs =
        quick_xml::de::from_str(body).map_err(|e| JenkinsError::Parse(e.to_string()))?;

    Ok(found
        .builds
        .into_iter()
        .map(|b| b.number)
        .find(|n| *n != 0)
        .map(InstanceId))
}
