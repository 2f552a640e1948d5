//! News ingestion, AI summaries and tag classification.
//!
//! Summaries and tags are best-effort: without a completion provider, or when
//! the provider fails, a summary degrades to an empty string and a document is
//! left untagged. Neither case fails the surrounding operation.

use std::sync::{Arc, LazyLock};

use corretora_core::{DocPath, MIN_TAGS, NewsDocument, TagVocabulary, collections};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::stores::{Document, DocumentStore, StoreError};

use super::completion::{ChatMessage, CompletionProvider};

/// A `[...]` block in a model response.
static JSON_ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("Invalid regex"));

const SUMMARY_SYSTEM_PROMPT: &str = "És um assistente de uma corretora de seguros portuguesa. \
     Escreves resumos curtos, factuais e neutros de notícias do setor segurador.";

const TAGS_SYSTEM_PROMPT: &str = "Classificas notícias do setor segurador. \
     Respondes apenas com um array JSON de etiquetas, sem texto adicional.";

/// Errors from news operations.
#[derive(Debug, Error)]
pub enum NewsError {
    /// A required field is missing or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The document store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A news article to ingest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl NewsInput {
    /// Trim every field and reject blanks in the required ones.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::MissingField` naming the first blank required field.
    pub fn validate(self) -> Result<NewsDocument, NewsError> {
        let title = required(&self.title, "title")?;
        let url = required(&self.url, "url")?;
        let source = required(&self.source, "source")?;

        Ok(NewsDocument {
            title,
            url,
            source,
            region: self.region.map(|r| r.trim().to_string()).unwrap_or_default(),
            summary: String::new(),
            published_at: self
                .published_at
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            tags: None,
        })
    }
}

fn required(value: &str, name: &'static str) -> Result<String, NewsError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NewsError::MissingField(name));
    }
    Ok(value.to_string())
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub id: String,
    pub summary: String,
}

/// Counts from a tag backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Documents that received tags (or would have, in a dry run).
    pub tagged: usize,
    /// Documents already tagged, or left untagged because classification
    /// failed or produced too few tags.
    pub skipped: usize,
    /// Documents that could not be read or whose tag write failed.
    pub failed: usize,
}

/// Document id for a news URL: hex SHA-256 of the trimmed URL.
#[must_use]
pub fn news_id(url: &str) -> String {
    hex::encode(Sha256::digest(url.trim().as_bytes()))
}

/// Extract the tags from a model response.
///
/// Uses the first bracketed block that parses as a JSON array, so prose such
/// as `[Resposta]` ahead of the array is passed over. Non-string entries are
/// ignored and the rest are filtered through the vocabulary. Returns an empty
/// list when no array can be parsed.
#[must_use]
pub fn parse_tag_response(text: &str, vocabulary: &TagVocabulary) -> Vec<String> {
    JSON_ARRAY_RE
        .find_iter(text)
        .find_map(|m| serde_json::from_str::<Vec<Value>>(m.as_str()).ok())
        .map(|values| vocabulary.filter(values.iter().filter_map(Value::as_str)))
        .unwrap_or_default()
}

/// News summaries, tags and ingestion.
#[derive(Clone)]
pub struct NewsService {
    documents: Arc<dyn DocumentStore>,
    completion: Option<Arc<dyn CompletionProvider>>,
    vocabulary: TagVocabulary,
}

impl NewsService {
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        completion: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self {
            documents,
            completion,
            vocabulary: TagVocabulary::default(),
        }
    }

    /// Write a short summary of an article. Returns `""` when no completion
    /// provider is configured or the call fails.
    #[instrument(skip(self, news), fields(url = %news.url))]
    pub async fn summarize(&self, news: &NewsDocument) -> String {
        let Some(completion) = &self.completion else {
            return String::new();
        };

        let prompt = format!(
            "Resume em português de Portugal, em 2 a 3 frases, a seguinte notícia.\n\
             Título: {}\nFonte: {}\nRegião: {}\nURL: {}",
            news.title, news.source, news.region, news.url
        );
        let messages = [ChatMessage::system(SUMMARY_SYSTEM_PROMPT), ChatMessage::user(prompt)];

        match completion.complete(&messages).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(url = %news.url, error = %e, "Summary generation failed");
                String::new()
            }
        }
    }

    /// Pick tags for an article.
    ///
    /// Returns `None` when no provider is configured, the call fails, or fewer
    /// than [`MIN_TAGS`] allowed tags survive filtering.
    #[instrument(skip(self, news), fields(url = %news.url))]
    pub async fn classify(&self, news: &NewsDocument) -> Option<Vec<String>> {
        let completion = self.completion.as_ref()?;

        let prompt = format!(
            "Escolhe entre 2 e 4 etiquetas para esta notícia, usando apenas esta lista: {}.\n\
             Responde só com um array JSON, por exemplo [\"auto\",\"mercado\"].\n\
             Título: {}\nResumo: {}\nFonte: {}",
            self.vocabulary.as_slice().join(", "),
            news.title,
            news.summary,
            news.source
        );
        let messages = [ChatMessage::system(TAGS_SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let response = match completion.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(url = %news.url, error = %e, "Tag classification failed");
                return None;
            }
        };

        let tags = parse_tag_response(&response, &self.vocabulary);
        if tags.len() < MIN_TAGS {
            tracing::info!(url = %news.url, ?tags, "Too few allowed tags, leaving untagged");
            return None;
        }
        Some(tags)
    }

    /// Summarize an article and merge it into `news/{sha256(url)}`.
    ///
    /// # Errors
    ///
    /// Returns `NewsError::MissingField` for blank input, or
    /// `NewsError::Store` if the write fails.
    #[instrument(skip(self, input))]
    pub async fn upsert(&self, input: NewsInput) -> Result<UpsertOutcome, NewsError> {
        let mut news = input.validate()?;
        let id = news_id(&news.url);
        let path = collections::news(&id).map_err(|e| StoreError::Decode(e.to_string()))?;

        news.summary = self.summarize(&news).await;

        // An existing article keeps its original publication time.
        let default_published = news.published_at.is_none() && !self.documents.exists(&path).await?;

        let now = chrono::Utc::now().to_rfc3339();
        let fields = news_fields(&news, &now, default_published);
        self.documents.merge(&path, fields).await?;

        tracing::info!(id = %id, url = %news.url, has_summary = !news.summary.is_empty(), "News upserted");
        Ok(UpsertOutcome {
            id,
            summary: news.summary,
        })
    }

    /// Tag every untagged news document, one at a time.
    ///
    /// Documents with any `tags` field are skipped. Per-document failures are
    /// logged and counted; only a failed listing aborts the run.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the collection cannot be listed.
    #[instrument(skip(self))]
    pub async fn backfill_tags(
        &self,
        dry_run: bool,
        limit: Option<usize>,
    ) -> Result<BackfillReport, StoreError> {
        let documents = self.documents.list(collections::NEWS).await?;
        let mut report = BackfillReport::default();
        let mut attempted = 0usize;

        for stored in documents {
            if stored.fields.contains_key("tags") {
                report.skipped += 1;
                continue;
            }
            if limit.is_some_and(|max| attempted >= max) {
                break;
            }
            attempted += 1;

            let news: NewsDocument = match serde_json::from_value(Value::Object(stored.fields)) {
                Ok(news) => news,
                Err(e) => {
                    tracing::warn!(path = %stored.path, error = %e, "Unreadable news document");
                    report.failed += 1;
                    continue;
                }
            };

            let Some(tags) = self.classify(&news).await else {
                report.skipped += 1;
                continue;
            };

            if dry_run {
                tracing::info!(path = %stored.path, ?tags, "Would tag (dry run)");
                report.tagged += 1;
                continue;
            }

            match self.write_tags(&stored.path, &tags).await {
                Ok(()) => {
                    tracing::info!(path = %stored.path, ?tags, "Tagged");
                    report.tagged += 1;
                }
                Err(e) => {
                    tracing::error!(path = %stored.path, error = %e, "Failed to write tags");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            tagged = report.tagged,
            skipped = report.skipped,
            failed = report.failed,
            dry_run,
            "Tag backfill finished"
        );
        Ok(report)
    }

    async fn write_tags(&self, path: &DocPath, tags: &[String]) -> Result<(), StoreError> {
        let mut fields = Document::new();
        fields.insert("tags".to_string(), json!(tags));
        self.documents.merge(path, fields).await
    }
}

/// Fields for an upsert merge. `region` and `publishedAt` are only written
/// when known, so a re-ingest without them leaves the stored values alone.
fn news_fields(news: &NewsDocument, now: &str, default_published: bool) -> Document {
    let mut fields = Document::new();
    fields.insert("title".to_string(), json!(news.title));
    fields.insert("url".to_string(), json!(news.url));
    fields.insert("source".to_string(), json!(news.source));
    if !news.region.is_empty() {
        fields.insert("region".to_string(), json!(news.region));
    }
    fields.insert("summary".to_string(), json!(news.summary));
    match news.published_at.as_deref() {
        Some(published) => {
            fields.insert("publishedAt".to_string(), json!(published));
        }
        None if default_published => {
            fields.insert("publishedAt".to_string(), json!(now));
        }
        None => {}
    }
    fields.insert("updatedAt".to_string(), json!(now));
    fields
}
