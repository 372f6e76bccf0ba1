//! herald CLI tool.

use clap::{Parser, Subcommand};
use herald_core::RepoName;
use tracing_subscriber::EnvFilter;
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "herald PR/CI bridge CLI", long_about = None)]
struct Cli {
    /// herald server URL
    #[arg(long, env = "HERALD_API_URL", default_value = "http://localhost:8080")]
    api_url: Url,

    /// Operator user for build requests
    #[arg(long, env = "HERALD_USER", default_value = "")]
    user: String,

    /// Operator password for build requests
    #[arg(long, env = "HERALD_PASS", default_value = "", hide_env_values = true)]
    pass: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a service configuration
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "herald.kdl")]
        path: String,
    },
    /// Schedule one build for one pull request
    Trigger {
        /// Repository as owner/name
        #[arg(long)]
        repo: RepoName,
        /// Status context of the build
        #[arg(long, default_value = "")]
        context: String,
        /// Pull request number
        #[arg(long)]
        number: u64,
    },
    /// Schedule a build for every open pull request that has not run it
    RetryFailed {
        /// Repository as owner/name
        #[arg(long)]
        repo: RepoName,
        /// Status context of the build
        #[arg(long, default_value = "")]
        context: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let server = commands::ServerClient::new(cli.api_url, cli.user, cli.pass);

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Trigger {
            repo,
            context,
            number,
        } => {
            commands::builds::trigger(&server, &repo, &context, number).await?;
        }
        Commands::RetryFailed { repo, context } => {
            commands::builds::retry_failed(&server, &repo, &context).await?;
        }
    }

    Ok(())
}
