//! herald API server

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use herald_api::{AppState, routes};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "herald-server")]
#[command(about = "Bridges GitHub pull requests and Jenkins builds", long_about = None)]
struct Args {
    /// Path to the KDL configuration file
    #[arg(long, env = "HERALD_CONFIG", default_value = "herald.kdl")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = herald_config::load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let addr = config.server.listen;
    info!(
        builds = config.catalog.len(),
        policy = %config.server.build_commits,
        "Configuration loaded"
    );

    let state = AppState::from_config(config).context("building backends")?;
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    info!("Starting server on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
