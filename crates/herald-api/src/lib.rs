//! HTTP server for herald.
//!
//! Receives GitHub webhooks, Jenkins build notifications and operator build
//! requests, and hands them to the orchestration engine.

pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use state::AppState;
