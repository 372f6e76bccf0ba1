//! API routes.

pub mod builds;
pub mod health;
pub mod notifications;
pub mod webhooks;

use axum::Router;

use crate::AppState;

/// Build the main router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/webhooks", webhook_router())
        .nest("/build", builds::router())
        .merge(health::router())
        .with_state(state)
}

fn webhook_router() -> Router<AppState> {
    Router::new()
        .merge(webhooks::router())
        .merge(notifications::router())
}
