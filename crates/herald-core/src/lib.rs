//! Core domain types and traits for herald.
//!
//! This crate contains:
//! - Build definitions and the read-only build catalog
//! - Pull request, commit and status types
//! - CI notification payloads and build parameters
//! - Capability traits for the source-control and CI systems
//! - In-memory fakes of those traits for tests

pub mod build;
pub mod ci;
pub mod error;
pub mod event;
pub mod fakes;
pub mod notification;
pub mod pull_request;
pub mod repo;
pub mod source_control;
pub mod status;

pub use build::{BuildCatalog, BuildDefinition, CatalogError, DEFAULT_CONTEXT};
pub use ci::{BuildParameters, CiServer, InstanceId, InstanceQuery, InstanceQueryKind};
pub use error::{Error, Result};
pub use repo::RepoName;
pub use source_control::SourceControl;
pub use status::{CommitSelectionPolicy, CommitState};
