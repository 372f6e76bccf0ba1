//! Build request commands.

use anyhow::Result;
use herald_core::RepoName;
use serde_json::json;

use super::ServerClient;

pub async fn trigger(
    server: &ServerClient,
    repo: &RepoName,
    context: &str,
    number: u64,
) -> Result<()> {
    server
        .post(
            "build/custom",
            &json!({ "number": number, "repo": repo, "context": context }),
        )
        .await?;
    println!("Scheduled {} for {}#{}", display_context(context), repo, number);
    Ok(())
}

pub async fn retry_failed(server: &ServerClient, repo: &RepoName, context: &str) -> Result<()> {
    server
        .post("build/cron", &json!({ "repo": repo, "context": context }))
        .await?;
    println!(
        "Scheduled {} for open pull requests of {} without a result",
        display_context(context),
        repo
    );
    Ok(())
}

fn display_context(context: &str) -> &str {
    if context.is_empty() {
        herald_core::DEFAULT_CONTEXT
    } else {
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use url::Url;

    fn client(server: &Server) -> ServerClient {
        ServerClient::new(
            Url::parse(&server.url()).unwrap(),
            "operator".to_string(),
            "secret".to_string(),
        )
    }

    #[tokio::test]
    async fn test_trigger_posts_custom_build() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/build/custom")
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .match_body(Matcher::Json(json!({
                "number": 4,
                "repo": "example-org/example",
                "context": "ci/nightly"
            })))
            .with_status(204)
            .create_async()
            .await;

        let repo = RepoName::new("example-org", "example");
        trigger(&client(&server), &repo, "ci/nightly", 4)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retry_failed_reports_rejection() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/build/cron")
            .with_status(401)
            .create_async()
            .await;

        let repo = RepoName::new("example-org", "example");
        let err = retry_failed(&client(&server), &repo, "ci/linux")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
    }
}
