//! Error types for herald.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The upstream service answered 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// No build definition matches; always a configuration mismatch.
    #[error("not in build catalog: {0}")]
    NotInCatalog(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("scheduling failed: {url} responded with status {code}")]
    Scheduling { code: u16, url: String },

    #[error("cancellation failed: {url} responded with status {code}")]
    Cancellation { code: u16, url: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
