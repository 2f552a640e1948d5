//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are `{"ok": false, "error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{EmailError, NewsError, SyncError};
use crate::stores::StoreError;
use crate::triggers::TriggerError;

/// Application-level error type for the functions.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity token could not be verified.
    #[error("Token verification failed: {0}")]
    TokenVerification(#[source] StoreError),

    /// Claim synchronization failed.
    #[error("Claim sync failed: {0}")]
    ClaimSync(#[from] SyncError),

    /// News ingestion failed.
    #[error("News error: {0}")]
    News(#[from] NewsError),

    /// A document trigger failed.
    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    /// An upstream API could not be reached.
    #[error("Upstream error: {0}")]
    Upstream(#[from] EmailError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::News(NewsError::MissingField(_)) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            // Token verification failures keep their historical 500.
            Self::TokenVerification(_)
            | Self::ClaimSync(_)
            | Self::News(NewsError::Store(_))
            | Self::Trigger(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) => msg.clone(),
            Self::News(NewsError::MissingField(field)) => format!("Missing required field: {field}"),
            Self::TokenVerification(_) => "Could not verify identity token".to_string(),
            Self::Upstream(_) => "Email service unreachable".to_string(),
            _ => "Internal server error".to_string(),
        };

        (status, Json(json!({ "ok": false, "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after verifying an identity token to associate errors with users.
pub fn set_sentry_user(uid: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            ..Default::default()
        }));
    });
}
