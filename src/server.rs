//! HTTP surface — the cron trigger endpoint and a mailbox status check.
//!
//! Both routes sit behind the same two checks: the scheduler's origin
//! marker header, then a bearer-token shared secret. Anything else is a
//! 401 before any provider call is made.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::error;

use crate::pipeline::TriagePipeline;

/// Header the scheduler sets to mark a cron-originated request.
pub const CRON_HEADER: &str = "x-cron-trigger";

/// Shared state for the cron routes.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TriagePipeline>,
    pub cron_secret: SecretString,
}

/// Build the cron trigger routes.
pub fn cron_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/cron/triage", post(run_triage))
        .route("/api/cron/status", get(mailbox_status))
        .with_state(state)
}

/// POST /api/cron/triage
///
/// One triage invocation: fetch recent unread, classify, relabel.
/// Returns the per-message verdicts and a processed-count summary.
async fn run_triage(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, &state.cron_secret) {
        return denied;
    }

    match state.pipeline.run().await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "results": summary.outcomes,
                "message": format!(
                    "Successfully processed {} unread messages",
                    summary.fetched
                ),
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Error processing emails");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to process emails",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/cron/status
///
/// Connectivity check: fetches the mailbox profile so a misconfigured
/// credential shows up before the next scheduled sweep does nothing.
async fn mailbox_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&headers, &state.cron_secret) {
        return denied;
    }

    match state.pipeline.mailbox().get_profile().await {
        Ok(profile) => (
            StatusCode::OK,
            Json(json!({
                "emailAddress": profile.email_address,
                "messagesTotal": profile.messages_total,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Error querying mailbox profile");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to query mailbox",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Validate the cron-origin marker and the bearer secret, in that order.
fn authorize(headers: &HeaderMap, secret: &SecretString) -> Result<(), Response> {
    let cron_marker = headers
        .get(CRON_HEADER)
        .and_then(|v| v.to_str().ok());
    if cron_marker != Some("true") {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized origin"})),
        )
            .into_response());
    }

    let expected = format!("Bearer {}", secret.expose_secret());
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Failed to provide correct cron job secret"})),
        )
            .into_response());
    }

    Ok(())
}
