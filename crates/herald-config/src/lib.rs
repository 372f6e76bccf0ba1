//! KDL configuration parsing for herald.
//!
//! This crate handles parsing of:
//! - Service settings (server, GitHub, Jenkins)
//! - Build definitions, assembled into the build catalog
//! - Environment overrides for secrets

pub mod builds;
pub mod error;
mod nodes;
pub mod service;

pub use error::{ConfigError, ConfigResult};
pub use service::{
    GitHubSettings, JenkinsSettings, ServerSettings, ServiceConfig, load_config, parse_config,
};
