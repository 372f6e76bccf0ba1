//! CLI command implementations.

pub mod builds;

use anyhow::{Context, Result, bail};
use herald_config::ServiceConfig;
use tracing::debug;
use url::Url;

/// Client for the operator endpoints of a running server.
pub struct ServerClient {
    http: reqwest::Client,
    base_url: Url,
    user: String,
    pass: String,
}

impl ServerClient {
    pub fn new(base_url: Url, user: String, pass: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            user,
            pass,
        }
    }

    /// POST `body` to `path`; anything but 204 is an error.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<()> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid path {}", path))?;
        debug!(%url, "POST");

        let response = self
            .http
            .post(url.clone())
            .basic_auth(&self.user, Some(&self.pass))
            .json(body)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if status != reqwest::StatusCode::NO_CONTENT {
            let text = response.text().await.unwrap_or_default();
            bail!("{} answered {}: {}", url, status, text);
        }
        Ok(())
    }
}

pub fn validate(path: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let config = herald_config::parse_config(&content)
        .with_context(|| format!("invalid configuration in {}", path))?;

    println!("Configuration is valid");
    for line in summarize(&config) {
        println!("  {}", line);
    }
    Ok(())
}

fn summarize(config: &ServiceConfig) -> Vec<String> {
    let mut lines = vec![format!(
        "commit selection: {}, instance query: {}",
        config.server.build_commits, config.jenkins.instance_query
    )];
    lines.extend(config.catalog.iter().map(|build| {
        let mut kind = Vec::new();
        if build.custom {
            kind.push("custom");
        }
        if build.downstream {
            kind.push("downstream");
        }
        let kind = if kind.is_empty() {
            String::new()
        } else {
            format!(" ({})", kind.join(", "))
        };
        format!("{} {} -> {}{}", build.repo, build.context, build.job, kind)
    }));
    lines
}
