//! Build orchestration for herald.
//!
//! Turns pull-request, review and CI notifications into commit statuses,
//! cancellations and scheduled builds. The engine keeps no state between
//! events; everything lives in the source-control and CI systems.

pub mod authorization;
pub mod engine;
pub mod jenkins;
pub mod reporter;
pub mod resolver;
pub mod retry;

pub use authorization::AuthorizationGate;
pub use engine::{
    EngineSettings, NotificationOutcome, OrchestrationEngine, PullRequestOutcome, ReviewOutcome,
};
pub use jenkins::JenkinsScheduler;
pub use reporter::StatusReporter;
pub use resolver::CommitResolver;
pub use retry::RetryPolicy;
