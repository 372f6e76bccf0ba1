//! Service configuration parsing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use herald_core::{BuildCatalog, CommitSelectionPolicy, InstanceQueryKind};
use kdl::{KdlDocument, KdlNode};
use url::Url;

use crate::builds::parse_builds;
use crate::nodes::{child_integer, child_string, child_strings, required_child_string};
use crate::{ConfigError, ConfigResult};

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_WEB_URL: &str = "https://github.com";
const DEFAULT_UNAUTHORIZED_CONTEXT: &str = "herald/unauthorized";

/// Everything the server needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub github: GitHubSettings,
    pub jenkins: JenkinsSettings,
    pub catalog: BuildCatalog,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    /// Basic-auth credentials for the operator endpoints.
    pub user: Option<String>,
    pub pass: Option<String>,
    pub build_commits: CommitSelectionPolicy,
    /// Shared secret for `X-Hub-Signature-256` verification.
    pub webhook_secret: Option<String>,
    /// Timeout applied to every outbound request. `None` keeps the client default.
    pub http_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub token: String,
    /// Login the service posts comments as.
    pub user: Option<String>,
    pub org: String,
    pub base_repo: String,
    pub api_url: Url,
    pub web_url: Url,
    /// Teams whose members may trigger builds. Empty allows everyone.
    pub teams: Vec<String>,
    pub unauthorized_context: String,
}

impl GitHubSettings {
    /// Pull-request listing used as the target of the unauthorized status.
    pub fn pull_request_listing_url(&self) -> String {
        format!(
            "{}/{}/{}/pulls/",
            self.web_url.as_str().trim_end_matches('/'),
            self.org,
            self.base_repo
        )
    }
}

#[derive(Debug, Clone)]
pub struct JenkinsSettings {
    pub base_url: Url,
    pub username: String,
    pub token: String,
    pub instance_query: InstanceQueryKind,
    /// Status code the active-instance query answers with on success.
    pub query_status: u16,
}

/// Parse the service configuration from KDL text.
pub fn parse_config(kdl: &str) -> ConfigResult<ServiceConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let server = match find_node(&doc, "server") {
        Some(node) => parse_server(node)?,
        None => parse_server(&KdlNode::new("server"))?,
    };
    let github = parse_github(
        find_node(&doc, "github").ok_or_else(|| ConfigError::MissingField("github".to_string()))?,
    )?;
    let jenkins = parse_jenkins(
        find_node(&doc, "jenkins")
            .ok_or_else(|| ConfigError::MissingField("jenkins".to_string()))?,
    )?;
    let catalog = parse_builds(&doc)?;

    Ok(ServiceConfig {
        server,
        github,
        jenkins,
        catalog,
    })
}

/// Read and parse a configuration file, then apply environment overrides.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

impl ServiceConfig {
    /// Replace secrets with `GITHUB_TOKEN`, `JENKINS_TOKEN` and `HERALD_PASS` when set.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = token;
        }
        if let Some(token) = lookup("JENKINS_TOKEN") {
            self.jenkins.token = token;
        }
        if let Some(pass) = lookup("HERALD_PASS") {
            self.server.pass = Some(pass);
        }
    }
}

fn find_node<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlNode> {
    doc.nodes().iter().find(|n| n.name().value() == name)
}

fn parse_server(node: &KdlNode) -> ConfigResult<ServerSettings> {
    let listen = child_string(node, "listen").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let listen = listen.parse().map_err(|_| ConfigError::InvalidValue {
        field: "server listen".to_string(),
        message: format!("'{}' is not a socket address", listen),
    })?;

    let build_commits = match child_string(node, "build-commits") {
        Some(policy) => policy.parse().map_err(|e: herald_core::Error| {
            ConfigError::InvalidValue {
                field: "server build-commits".to_string(),
                message: e.to_string(),
            }
        })?,
        None => CommitSelectionPolicy::default(),
    };

    Ok(ServerSettings {
        listen,
        user: child_string(node, "user"),
        pass: child_string(node, "pass"),
        build_commits,
        webhook_secret: child_string(node, "webhook-secret").filter(|s| !s.is_empty()),
        http_timeout: child_integer(node, "http-timeout-secs")?.map(Duration::from_secs),
    })
}

fn parse_github(node: &KdlNode) -> ConfigResult<GitHubSettings> {
    Ok(GitHubSettings {
        token: child_string(node, "token").unwrap_or_default(),
        user: child_string(node, "user"),
        org: required_child_string(node, "org")?,
        base_repo: required_child_string(node, "base-repo")?,
        api_url: parse_url(node, "api-url", DEFAULT_API_URL)?,
        web_url: parse_url(node, "web-url", DEFAULT_WEB_URL)?,
        teams: child_strings(node, "teams"),
        unauthorized_context: child_string(node, "unauthorized-context")
            .unwrap_or_else(|| DEFAULT_UNAUTHORIZED_CONTEXT.to_string()),
    })
}

fn parse_jenkins(node: &KdlNode) -> ConfigResult<JenkinsSettings> {
    let base_url = required_child_string(node, "base-url")?;
    let base_url = Url::parse(&base_url).map_err(|e| ConfigError::InvalidValue {
        field: "jenkins base-url".to_string(),
        message: e.to_string(),
    })?;

    let instance_query = match child_string(node, "instance-query") {
        Some(kind) => kind.parse().map_err(|e: herald_core::Error| {
            ConfigError::InvalidValue {
                field: "jenkins instance-query".to_string(),
                message: e.to_string(),
            }
        })?,
        None => InstanceQueryKind::default(),
    };

    let query_status = match child_integer(node, "query-status")? {
        Some(code) => u16::try_from(code).map_err(|_| ConfigError::InvalidValue {
            field: "jenkins query-status".to_string(),
            message: format!("{} is not an HTTP status code", code),
        })?,
        None => 200,
    };

    Ok(JenkinsSettings {
        base_url,
        username: child_string(node, "username").unwrap_or_default(),
        token: child_string(node, "token").unwrap_or_default(),
        instance_query,
        query_status,
    })
}

fn parse_url(node: &KdlNode, name: &str, default: &str) -> ConfigResult<Url> {
    let raw = child_string(node, name).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
        field: format!("{} {}", node.name().value(), name),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        server {
            listen "127.0.0.1:9000"
            user "operator"
            pass "secret"
            build-commits "new"
            webhook-secret "hook-secret"
            http-timeout-secs 30
        }
        github {
            token "gh-token"
            user "herald-bot"
            org "example-org"
            base-repo "example"
            teams "core" "reviewers"
        }
        jenkins {
            base-url "https://jenkins.example.org"
            username "bot"
            token "jenkins-token"
            instance-query "pr-and-sha"
        }
        build "example-org/example" job="pr-linux" context="ci/linux"
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap();

        assert_eq!(config.server.listen.port(), 9000);
        assert_eq!(config.server.user.as_deref(), Some("operator"));
        assert_eq!(config.server.build_commits, CommitSelectionPolicy::New);
        assert_eq!(config.server.webhook_secret.as_deref(), Some("hook-secret"));
        assert_eq!(config.server.http_timeout, Some(Duration::from_secs(30)));

        assert_eq!(config.github.teams, vec!["core", "reviewers"]);
        assert_eq!(config.github.api_url.as_str(), "https://api.github.com/");
        assert_eq!(config.github.unauthorized_context, "herald/unauthorized");
        assert_eq!(
            config.github.pull_request_listing_url(),
            "https://github.com/example-org/example/pulls/"
        );

        assert_eq!(config.jenkins.instance_query, InstanceQueryKind::PrAndSha);
        assert_eq!(config.jenkins.query_status, 200);
        assert_eq!(config.catalog.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let config = parse_config(
            r#"
            github {
                org "example-org"
                base-repo "example"
            }
            jenkins {
                base-url "https://jenkins.example.org"
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen.to_string(), DEFAULT_LISTEN);
        assert_eq!(config.server.build_commits, CommitSelectionPolicy::Last);
        assert_eq!(config.server.http_timeout, None);
        assert!(config.github.teams.is_empty());
        assert_eq!(config.jenkins.instance_query, InstanceQueryKind::Pr);
        assert!(config.catalog.is_empty());
    }

    #[test]
    fn test_missing_sections() {
        let err = parse_config(r#"jenkins { base-url "https://j.example.org" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "github"));
    }

    #[test]
    fn test_invalid_policy() {
        let err = parse_config(&FULL.replace(r#""new""#, r#""some""#)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = parse_config(FULL).unwrap();
        config.apply_env_overrides(|key| match key {
            "GITHUB_TOKEN" => Some("from-env".to_string()),
            "JENKINS_TOKEN" => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.github.token, "from-env");
        assert_eq!(config.jenkins.token, "jenkins-token");
        assert_eq!(config.server.pass.as_deref(), Some("secret"));
    }
}
