//! GitHub webhook endpoint.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use hmac::{Hmac, Mac};
use herald_core::event::{PullRequestEvent, ReviewEvent};
use herald_scheduler::ReviewOutcome;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/github", post(github_webhook))
}

/// Handle GitHub webhook events.
async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let event_type = headers
        .get("X-GitHub-Event")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing X-GitHub-Event header".to_string()))?;

    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok());
        if !verify_github_signature(secret, &body, signature) {
            warn!(event = %event_type, "Invalid webhook signature");
            return Err(ApiError::Unauthorized("invalid signature".to_string()));
        }
    }

    info!(
        event = %event_type,
        delivery = headers.get("X-GitHub-Delivery").and_then(|v| v.to_str().ok()),
        "Received GitHub webhook"
    );

    match event_type {
        "pull_request" => {
            let event: PullRequestEvent = parse_payload(&body)?;
            let outcome = state.engine.on_pull_request_event(&event).await?;
            info!(pr = event.number, ?outcome, "Handled pull request event");
        }
        "pull_request_review" => {
            let event: ReviewEvent = parse_payload(&body)?;
            let outcome = state.engine.on_review(&event).await?;
            info!(pr = event.pull_request.number, ?outcome, "Handled review event");
            if outcome == ReviewOutcome::Forbidden {
                return Err(ApiError::Forbidden(format!(
                    "{} may not re-run builds",
                    event.review.user.login
                )));
            }
        }
        "ping" => {
            info!("Ping event received - webhook is configured correctly");
        }
        _ => {
            info!(event = %event_type, "Unhandled event type");
        }
    }

    Ok(StatusCode::OK)
}

fn parse_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))
}

/// Check an `X-Hub-Signature-256` header (`sha256=<hex>`) against the body.
fn verify_github_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature else {
        return false;
    };

    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_signature() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign("hook-secret", body);
        assert!(verify_github_signature("hook-secret", body, Some(&signature)));
    }

    #[test]
    fn test_invalid_signatures() {
        let body = br#"{"action":"opened"}"#;
        let signature = sign("other-secret", body);

        assert!(!verify_github_signature("hook-secret", body, Some(&signature)));
        assert!(!verify_github_signature("hook-secret", body, None));
        assert!(!verify_github_signature("hook-secret", body, Some("sha1=abcd")));
        assert!(!verify_github_signature("hook-secret", body, Some("sha256=zz")));
    }
}
