//! Jenkins build notifications.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use herald_core::notification::CiNotification;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/jenkins", post(jenkins_notification))
}

async fn jenkins_notification(
    State(state): State<AppState>,
    Json(notification): Json<CiNotification>,
) -> Result<StatusCode, ApiError> {
    info!(
        job = %notification.name,
        build = notification.build.number,
        phase = %notification.build.phase,
        status = notification.build.status.as_deref().unwrap_or_default(),
        "Received Jenkins notification"
    );

    let outcome = state.engine.on_ci_notification(&notification).await?;
    info!(job = %notification.name, ?outcome, "Handled Jenkins notification");
    Ok(StatusCode::OK)
}
