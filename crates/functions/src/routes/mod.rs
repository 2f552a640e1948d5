//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check
//! POST /upsert-news-with-summary  - Ingest a news article with an AI summary
//! POST /send-contact-email        - Forward a contact form to the email service
//! GET  /sync-admin-claims         - Re-derive the caller's admin claim
//! POST /sync-admin-claims         - Same as GET
//! POST /events                    - Document-event delivery (only with a shared secret)
//! ```

pub mod claims;
pub mod contact;
pub mod events;
pub mod news;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_request_span, request_id_middleware};
use crate::state::AppState;

/// Create the function routes. `/events` is only mounted when an events
/// secret is configured.
pub fn routes(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/upsert-news-with-summary", post(news::upsert_news_with_summary))
        .route("/send-contact-email", post(contact::send_contact_email))
        .route(
            "/sync-admin-claims",
            get(claims::sync_admin_claims).post(claims::sync_admin_claims),
        );

    if state.config().events_secret.is_some() {
        router.route("/events", post(events::handle_event))
    } else {
        tracing::info!("EVENTS_SHARED_SECRET not set, /events is disabled");
        router
    }
}

/// Build the complete application with middleware.
pub fn app(state: AppState) -> Router {
    routes(&state)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(CorsLayer::permissive())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
