//! News ingestion route.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::NewsInput;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub ok: bool,
    pub id: String,
    pub summary: String,
}

/// Ingest a news article.
///
/// POST /upsert-news-with-summary
///
/// Body: `{title, url, source, region?, publishedAt?}`. The summary is empty
/// when no completion API is configured or the call fails.
#[instrument(skip(state, body))]
pub async fn upsert_news_with_summary(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewsInput>, JsonRejection>,
) -> Result<Json<UpsertResponse>> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let outcome = state.news().upsert(input).await?;

    Ok(Json(UpsertResponse {
        ok: true,
        id: outcome.id,
        summary: outcome.summary,
    }))
}
