//! Tag backfill for news documents.
//!
//! Documents are classified one at a time. A document that already has a
//! `tags` field is never touched, so the command can be re-run safely.

use corretora_functions::services::NewsService;
use corretora_functions::stores::StoreError;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during a backfill.
#[derive(Debug, Error)]
pub enum BackfillError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("OPENAI_API_KEY is required to classify news")]
    MissingCompletionKey,

    #[error("Failed to list news: {0}")]
    Store(#[from] StoreError),
}

/// Tag every untagged news document, up to `limit`.
pub async fn backfill(dry_run: bool, limit: Option<usize>) -> Result<(), BackfillError> {
    let (_config, backends) = connect()?;
    if backends.completion.is_none() {
        return Err(BackfillError::MissingCompletionKey);
    }
    let service = NewsService::new(backends.documents, backends.completion);

    if dry_run {
        tracing::info!("Dry run: no tags will be written");
    }

    let report = service.backfill_tags(dry_run, limit).await?;

    tracing::info!(
        "Backfill complete: {} tagged, {} skipped, {} failed",
        report.tagged,
        report.skipped,
        report.failed
    );
    Ok(())
}
