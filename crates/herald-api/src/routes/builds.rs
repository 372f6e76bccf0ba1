//! Operator build requests, guarded by basic auth.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};
use herald_core::RepoName;
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/custom", post(custom_build))
        .route("/cron", post(cron_build))
}

/// Schedule one build for one pull request.
#[derive(Debug, Deserialize)]
pub struct CustomBuildRequest {
    pub number: u64,
    pub repo: RepoName,
    #[serde(default)]
    pub context: String,
}

/// Schedule one build for every open pull request that has not run it.
#[derive(Debug, Deserialize)]
pub struct CronBuildRequest {
    pub repo: RepoName,
    #[serde(default)]
    pub context: String,
}

async fn custom_build(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    let request: CustomBuildRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;

    info!(
        repo = %request.repo,
        pr = request.number,
        context = %request.context,
        "Custom build requested"
    );
    let scheduled = state
        .engine
        .on_custom_build(&request.repo, &request.context, request.number)
        .await?;
    info!(repo = %request.repo, pr = request.number, scheduled, "Custom build scheduled");

    Ok(StatusCode::NO_CONTENT)
}

async fn cron_build(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    let request: CronBuildRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;

    info!(repo = %request.repo, context = %request.context, "Failed-build scan requested");
    state
        .engine
        .on_cron_build(&request.repo, &request.context)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Both user and password must match the configured operator.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(Authorization(credentials)) = headers.typed_get::<Authorization<Basic>>() else {
        return Err(ApiError::Unauthorized("missing credentials".to_string()));
    };

    match &state.operator {
        Some(operator) if operator.matches(credentials.username(), credentials.password()) => Ok(()),
        _ => {
            warn!(user = credentials.username(), "Rejected operator credentials");
            Err(ApiError::Unauthorized("invalid credentials".to_string()))
        }
    }
}
