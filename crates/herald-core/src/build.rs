//! Build definitions and the build catalog.
//!
//! The catalog is loaded once at startup and shared read-only, usually as an
//! `Arc<BuildCatalog>`.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Error, RepoName, Result};

/// Context used when a definition or request leaves it empty.
pub const DEFAULT_CONTEXT: &str = "continuous-integration/jenkins";

/// One buildable unit: a CI job bound to a repository and a status context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDefinition {
    pub repo: RepoName,
    /// Status-check label the build reports under.
    pub context: String,
    /// CI job name.
    pub job: String,
    /// Custom builds are never scheduled automatically for pull requests.
    pub custom: bool,
    /// Downstream builds only run after an upstream build succeeds.
    pub downstream: bool,
    /// Contexts to trigger, in order, when this build succeeds.
    pub downstream_contexts: Vec<String>,
    /// Base branches that suppress triggering this definition as a downstream build.
    pub exclude_targets: BTreeSet<String>,
}

impl BuildDefinition {
    pub fn new(repo: RepoName, job: impl Into<String>, context: impl Into<String>) -> Self {
        let context = context.into();
        Self {
            repo,
            context: if context.is_empty() {
                DEFAULT_CONTEXT.to_string()
            } else {
                context
            },
            job: job.into(),
            custom: false,
            downstream: false,
            downstream_contexts: Vec::new(),
            exclude_targets: BTreeSet::new(),
        }
    }

    pub fn custom(mut self, custom: bool) -> Self {
        self.custom = custom;
        self
    }

    pub fn downstream(mut self, downstream: bool) -> Self {
        self.downstream = downstream;
        self
    }

    pub fn with_downstream_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.downstream_contexts = contexts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a build targeting `base_branch` must not trigger this definition.
    pub fn excludes(&self, base_branch: &str) -> bool {
        self.exclude_targets.contains(base_branch)
    }
}

/// Violations detected while assembling a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate build for repo {repo} and context {context}")]
    DuplicateContext { repo: String, context: String },

    #[error("duplicate job: {0}")]
    DuplicateJob(String),

    #[error("build {job} triggers unknown downstream context {context}")]
    UnknownDownstream { job: String, context: String },
}

/// Immutable table of configured build definitions.
#[derive(Debug, Clone, Default)]
pub struct BuildCatalog {
    builds: Vec<BuildDefinition>,
}

impl BuildCatalog {
    pub fn new(builds: Vec<BuildDefinition>) -> std::result::Result<Self, CatalogError> {
        let mut contexts = HashSet::new();
        let mut jobs = HashSet::new();

        for build in &builds {
            if !contexts.insert((&build.repo, build.context.as_str())) {
                return Err(CatalogError::DuplicateContext {
                    repo: build.repo.to_string(),
                    context: build.context.clone(),
                });
            }
            if !jobs.insert(build.job.as_str()) {
                return Err(CatalogError::DuplicateJob(build.job.clone()));
            }
        }

        for build in &builds {
            for context in &build.downstream_contexts {
                if !contexts.contains(&(&build.repo, context.as_str())) {
                    return Err(CatalogError::UnknownDownstream {
                        job: build.job.clone(),
                        context: context.clone(),
                    });
                }
            }
        }

        Ok(Self { builds })
    }

    pub fn len(&self) -> usize {
        self.builds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildDefinition> {
        self.builds.iter()
    }

    /// All definitions for `repo` whose custom flag equals `custom`, in configuration order.
    pub fn find_by_repo(&self, repo: &RepoName, custom: bool) -> Result<Vec<&BuildDefinition>> {
        let builds: Vec<_> = self
            .builds
            .iter()
            .filter(|b| &b.repo == repo && b.custom == custom)
            .collect();

        if builds.is_empty() {
            return Err(Error::NotInCatalog(format!("no builds configured for {}", repo)));
        }
        Ok(builds)
    }

    pub fn find_by_job(&self, job: &str) -> Result<&BuildDefinition> {
        self.builds
            .iter()
            .find(|b| b.job == job)
            .ok_or_else(|| Error::NotInCatalog(format!("no build configured for job {}", job)))
    }

    /// Looks up a definition by context, treating an empty context as [`DEFAULT_CONTEXT`].
    pub fn find_by_context_and_repo(
        &self,
        context: &str,
        repo: &RepoName,
    ) -> Result<&BuildDefinition> {
        let context = if context.is_empty() {
            DEFAULT_CONTEXT
        } else {
            context
        };

        self.builds
            .iter()
            .find(|b| b.context == context && &b.repo == repo)
            .ok_or_else(|| {
                Error::NotInCatalog(format!(
                    "no build configured for context {}, repo {}",
                    context, repo
                ))
            })
    }
}
