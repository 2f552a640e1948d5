//! Contact form email proxy.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::email::missing_fields;
use crate::state::AppState;

/// Forward a contact-form payload to the email service.
///
/// POST /send-contact-email
///
/// Requires `service_id`, `template_id`, `user_id` and `template_params`.
/// The payload is sent once, unchanged. A non-2xx answer from the email
/// service is relayed with its status and body; an unreachable service is a
/// 502.
#[instrument(skip(state, body))]
pub async fn send_contact_email(
    State(state): State<AppState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let missing = missing_fields(&payload);
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let reply = state.email().send(&payload).await?;

    if reply.is_success() {
        tracing::info!(status = reply.status, "Contact email sent");
        return Ok(Json(json!({ "ok": true })).into_response());
    }

    tracing::warn!(status = reply.status, body = %reply.body, "Email service rejected contact email");
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(json!({ "ok": false, "error": reply.body }))).into_response())
}
