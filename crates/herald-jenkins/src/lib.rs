//! Jenkins backend for herald.
//!
//! Implements [`herald_core::CiServer`] on top of Jenkins' remote access API:
//! parameterized builds, XPath queries for unfinished builds and `stop`.

pub mod client;
pub mod error;

pub use client::JenkinsClient;
pub use error::JenkinsError;
