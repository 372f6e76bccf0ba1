//! Application state.

use std::sync::Arc;

use herald_config::ServiceConfig;
use herald_jenkins::JenkinsClient;
use herald_scheduler::{EngineSettings, OrchestrationEngine};

use crate::services::github::{GitHubClient, GitHubError};

/// Basic-auth credentials accepted by the operator endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorCredentials {
    pub user: String,
    pub pass: String,
}

impl OperatorCredentials {
    pub fn matches(&self, user: &str, pass: &str) -> bool {
        self.user == user && self.pass == pass
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<OrchestrationEngine>,
    pub webhook_secret: Option<Arc<str>>,
    /// `None` disables the operator endpoints.
    pub operator: Option<OperatorCredentials>,
}

/// Failures while wiring the backends together.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("GitHub client: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Jenkins client: {0}")]
    Jenkins(#[from] herald_jenkins::JenkinsError),
}

impl AppState {
    /// Builds the GitHub and Jenkins clients and the engine from configuration.
    pub fn from_config(config: ServiceConfig) -> Result<Self, StateError> {
        let mut github = GitHubClient::new(config.github.api_url.as_str(), &config.github.token)
            .with_login(config.github.user.clone());
        let mut jenkins = JenkinsClient::new(
            config.jenkins.base_url.as_str(),
            &config.jenkins.username,
            &config.jenkins.token,
        )
        .with_query_status(config.jenkins.query_status);

        if let Some(timeout) = config.server.http_timeout {
            github = github.with_timeout(timeout)?;
            jenkins = jenkins.with_timeout(timeout)?;
        }

        let settings = EngineSettings::from_config(&config);
        let engine = OrchestrationEngine::new(
            Arc::new(config.catalog),
            Arc::new(github),
            Arc::new(jenkins),
            settings,
        );

        let operator = match (config.server.user, config.server.pass) {
            (Some(user), Some(pass)) => Some(OperatorCredentials { user, pass }),
            _ => None,
        };

        Ok(Self {
            engine: Arc::new(engine),
            webhook_secret: config.server.webhook_secret.map(Arc::from),
            operator,
        })
    }

    /// State around an existing engine, without webhook secret or operator access.
    pub fn new(engine: OrchestrationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            webhook_secret: None,
            operator: None,
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_operator(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.operator = Some(OperatorCredentials {
            user: user.into(),
            pass: pass.into(),
        });
        self
    }
}
