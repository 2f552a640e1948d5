//! Email notification for a chat's first client message.
//!
//! `firstNotified` on the chat document flips to `true` only after a send
//! succeeds, so each chat produces at most one notification under normal
//! delivery.

use std::sync::Arc;

use corretora_core::{AuthorRole, ChatDocument, MessageDocument, collections};
use serde_json::json;
use tracing::instrument;

use crate::config::EmailConfig;
use crate::stores::{Document, DocumentStore, StoreError};

use super::email::{EmailError, EmailSender, FirstContact, first_contact_payload};

/// What the notifier did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Email sent and the chat marked as notified.
    Sent,
    /// The chat was already notified.
    AlreadyNotified,
    /// The message was not written by a client.
    NotFromClient,
    /// Sending failed; the chat stays un-notified.
    SendFailed,
}

/// Sends one notification per chat on the first client message.
#[derive(Clone)]
pub struct FirstMessageNotifier {
    documents: Arc<dyn DocumentStore>,
    email: Arc<dyn EmailSender>,
    config: EmailConfig,
}

impl FirstMessageNotifier {
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        email: Arc<dyn EmailSender>,
        config: EmailConfig,
    ) -> Self {
        Self {
            documents,
            email,
            config,
        }
    }

    /// Handle a newly created message in `chats/{chat_id}/messages`.
    ///
    /// Send failures are logged and reported as [`NotifyOutcome::SendFailed`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the chat cannot be read or marked.
    #[instrument(skip(self, message))]
    pub async fn on_message_created(
        &self,
        chat_id: &str,
        message: Option<&Document>,
    ) -> Result<NotifyOutcome, StoreError> {
        let message = message.map(MessageDocument::from_fields).unwrap_or_default();
        if message.author_role != AuthorRole::Client {
            return Ok(NotifyOutcome::NotFromClient);
        }

        let path = collections::chat(chat_id).map_err(|e| StoreError::Decode(e.to_string()))?;
        let chat = self
            .documents
            .get(&path)
            .await?
            .map(|fields| ChatDocument::from_fields(&fields))
            .unwrap_or_default();
        if chat.first_notified {
            return Ok(NotifyOutcome::AlreadyNotified);
        }

        let contact = FirstContact {
            chat_id,
            name: &chat.name,
            email: &chat.email,
            phone: &chat.phone,
            message: &message.text,
        };
        if let Err(e) = self.send(&contact).await {
            tracing::warn!(chat_id, error = %e, "First-contact notification not sent");
            return Ok(NotifyOutcome::SendFailed);
        }

        let mut fields = Document::new();
        fields.insert("firstNotified".to_string(), json!(true));
        self.documents.merge(&path, fields).await?;

        tracing::info!(chat_id, "First-contact notification sent");
        Ok(NotifyOutcome::Sent)
    }

    async fn send(&self, contact: &FirstContact<'_>) -> Result<(), EmailError> {
        let payload = first_contact_payload(&self.config, contact)?;
        self.email.send(&payload).await?.error_for_status()?;
        Ok(())
    }
}
