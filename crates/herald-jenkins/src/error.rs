//! Jenkins client errors.

use thiserror::Error;

/// Which remote call produced an unexpected response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Trigger,
    Query,
    Stop,
}

#[derive(Debug, Error)]
pub enum JenkinsError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("jenkins {url} responded with status {code}")]
    Status {
        operation: Operation,
        code: u16,
        url: String,
    },

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<JenkinsError> for herald_core::Error {
    fn from(err: JenkinsError) -> Self {
        match err {
            JenkinsError::Status {
                operation: Operation::Trigger,
                code,
                url,
            } => herald_core::Error::Scheduling { code, url },
            JenkinsError::Status {
                operation: Operation::Stop,
                code,
                url,
            } => herald_core::Error::Cancellation { code, url },
            other => herald_core::Error::Upstream(other.to_string()),
        }
    }
}
