//! Document-event delivery.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::config::secret_matches;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::triggers::{Dispatch, DocumentEvent};

/// Header carrying the events shared secret.
pub const EVENTS_SECRET_HEADER: &str = "x-events-secret";

/// Run the trigger registered for a document event.
///
/// POST /events
///
/// Body: `{kind, document, before?, after?}`. Unmatched events are accepted
/// with 202 and ignored. A failing handler is a 500.
#[instrument(skip(state, headers, body))]
pub async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Json<DocumentEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Some(expected) = state.config().events_secret.as_ref() else {
        return Err(AppError::Unauthorized("Event delivery is disabled".to_string()));
    };
    let presented = headers
        .get(EVENTS_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !secret_matches(expected, presented) {
        tracing::warn!("Rejected event with bad or missing secret");
        return Err(AppError::Unauthorized("Invalid event secret".to_string()));
    }

    let Json(event) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    match state
        .triggers()
        .dispatch(&event, state.trigger_targets())
        .await?
    {
        Dispatch::Unhandled => Ok((
            StatusCode::ACCEPTED,
            Json(json!({ "ok": true, "handled": false })),
        )),
        Dispatch::Handled(handler) => Ok((
            StatusCode::OK,
            Json(json!({ "ok": true, "handled": true, "handler": handler })),
        )),
    }
}
