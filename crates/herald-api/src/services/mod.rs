//! Clients for external services.

pub mod github;
