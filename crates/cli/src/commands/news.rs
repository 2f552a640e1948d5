//! News ingestion.
//!
//! # Usage
//!
//! ```bash
//! corretora-cli news ingest \
//!     --title "Prémios de seguro automóvel sobem" \
//!     --url https://eco.pt/noticia \
//!     --source ECO --region PT
//! ```
//!
//! Without `OPENAI_API_KEY` the item is stored with an empty summary.

use corretora_functions::services::{NewsError, NewsInput, NewsService};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur while ingesting news.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to upsert news: {0}")]
    News(#[from] NewsError),
}

/// Summarize and upsert one news item.
pub async fn ingest(
    title: String,
    url: String,
    source: String,
    region: Option<String>,
) -> Result<(), IngestError> {
    let (_config, backends) = connect()?;
    let service = NewsService::new(backends.documents, backends.completion);

    tracing::info!("Ingesting: {title}");
    let outcome = service
        .upsert(NewsInput {
            title,
            url,
            source,
            region,
            published_at: None,
        })
        .await?;

    if outcome.summary.is_empty() {
        tracing::warn!(id = %outcome.id, "Stored without a summary");
    } else {
        tracing::info!(id = %outcome.id, summary = %outcome.summary, "News stored");
    }
    Ok(())
}
