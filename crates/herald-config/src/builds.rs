//! Build definition parsing.

use std::sync::LazyLock;

use herald_core::{BuildCatalog, BuildDefinition, RepoName};
use kdl::{KdlDocument, KdlNode};
use regex::Regex;

use crate::nodes::{child_strings, get_bool_prop, get_first_string_arg, get_string_prop};
use crate::{ConfigError, ConfigResult};

static REPO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("repo pattern is valid")
});

/// Collect every top-level `build` node of `doc` into a catalog.
pub fn parse_builds(doc: &KdlDocument) -> ConfigResult<BuildCatalog> {
    let builds = doc
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "build")
        .map(parse_build)
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(BuildCatalog::new(builds)?)
}

fn parse_build(node: &KdlNode) -> ConfigResult<BuildDefinition> {
    let repo = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("build repo".to_string()))?;

    if !REPO_PATTERN.is_match(&repo) {
        return Err(ConfigError::InvalidValue {
            field: "build repo".to_string(),
            message: format!("expected owner/name, got '{}'", repo),
        });
    }
    let repo: RepoName = repo.parse().map_err(|e: herald_core::Error| ConfigError::InvalidValue {
        field: "build repo".to_string(),
        message: e.to_string(),
    })?;

    let job = get_string_prop(node, "job")
        .filter(|j| !j.is_empty())
        .ok_or_else(|| ConfigError::MissingField(format!("job for build of {}", repo)))?;
    let context = get_string_prop(node, "context").unwrap_or_default();

    Ok(BuildDefinition::new(repo, job, context)
        .custom(get_bool_prop(node, "custom").unwrap_or(false))
        .downstream(get_bool_prop(node, "downstream").unwrap_or(false))
        .with_downstream_contexts(child_strings(node, "downstream"))
        .with_exclude_targets(child_strings(node, "exclude-targets")))
}
