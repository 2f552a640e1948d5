//! Document-event triggers.
//!
//! The document store delivers create/update/delete events for documents it
//! holds. This module maps each `(event kind, path pattern)` pair to the
//! handler that reacts to it:
//!
//! | Event  | Pattern                               | Handler                        |
//! |--------|---------------------------------------|--------------------------------|
//! | create | `admins/{uid}`                        | grant admin claim              |
//! | delete | `admins/{uid}`                        | revoke admin claim             |
//! | update | `users/{uid}`                         | follow profile `isAdmin` flag  |
//! | create | `chats/{chatId}/messages/{messageId}` | first-contact email (opt-in)   |
//!
//! The first match wins. Events that match nothing are acknowledged and
//! ignored.

mod pattern;

use corretora_core::{DocPath, Uid, UidError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::services::{ClaimSynchronizer, ClaimUpdateError, FirstMessageNotifier, NotifyOutcome};
use crate::stores::{Document, StoreError};

pub use pattern::{Params, PathPattern, PatternError};

/// Kind of document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

/// A document change as delivered by the document store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocumentEvent {
    pub kind: EventKind,
    pub document: DocPath,
    /// Fields before the change; absent for creates.
    #[serde(default)]
    pub before: Option<Document>,
    /// Fields after the change; absent for deletes.
    #[serde(default)]
    pub after: Option<Document>,
}

/// The reaction bound to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerHandler {
    AuthorizationCreated,
    AuthorizationDeleted,
    ProfileUpdated,
    FirstChatMessage,
}

/// Errors raised while handling an event.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("invalid trigger pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("event path is missing parameter {0}")]
    MissingParam(&'static str),

    #[error("invalid uid in event path: {0}")]
    InvalidUid(#[from] UidError),

    #[error(transparent)]
    Claim(#[from] ClaimUpdateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("first-contact notifier is not configured")]
    NotifierUnavailable,
}

/// Result of dispatching an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// No trigger matched.
    Unhandled,
    /// The named handler ran to completion.
    Handled(TriggerHandler),
}

/// Collaborators the handlers call into.
#[derive(Clone)]
pub struct TriggerTargets {
    pub claims: ClaimSynchronizer,
    pub notifier: Option<FirstMessageNotifier>,
}

#[derive(Debug, Clone)]
struct Trigger {
    kind: EventKind,
    pattern: PathPattern,
    handler: TriggerHandler,
}

/// Ordered mapping from events to handlers.
#[derive(Debug, Clone, Default)]
pub struct TriggerRegistry {
    triggers: Vec<Trigger>,
}

impl TriggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The production trigger set. The first-contact notifier is only
    /// registered when `notifications_enabled` is set.
    ///
    /// # Errors
    ///
    /// Returns `TriggerError::Pattern` if a built-in pattern fails to parse.
    pub fn standard(notifications_enabled: bool) -> Result<Self, TriggerError> {
        let mut registry = Self::new()
            .register(EventKind::Create, "admins/{uid}", TriggerHandler::AuthorizationCreated)?
            .register(EventKind::Delete, "admins/{uid}", TriggerHandler::AuthorizationDeleted)?
            .register(EventKind::Update, "users/{uid}", TriggerHandler::ProfileUpdated)?;

        if notifications_enabled {
            registry = registry.register(
                EventKind::Create,
                "chats/{chatId}/messages/{messageId}",
                TriggerHandler::FirstChatMessage,
            )?;
        }
        Ok(registry)
    }

    /// Add a trigger after the existing ones.
    ///
    /// # Errors
    ///
    /// Returns `TriggerError::Pattern` if `pattern` is malformed.
    pub fn register(
        mut self,
        kind: EventKind,
        pattern: &str,
        handler: TriggerHandler,
    ) -> Result<Self, TriggerError> {
        self.triggers.push(Trigger {
            kind,
            pattern: PathPattern::parse(pattern)?,
            handler,
        });
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Find the handler for an event and the parameters bound by its pattern.
    #[must_use]
    pub fn resolve(&self, kind: EventKind, document: &DocPath) -> Option<(TriggerHandler, Params)> {
        self.triggers
            .iter()
            .filter(|t| t.kind == kind)
            .find_map(|t| t.pattern.matches(document).map(|params| (t.handler, params)))
    }

    /// Run the handler registered for an event, if any.
    ///
    /// # Errors
    ///
    /// Returns `TriggerError` if the matched handler fails.
    #[instrument(skip(self, event, targets), fields(kind = ?event.kind, document = %event.document))]
    pub async fn dispatch(
        &self,
        event: &DocumentEvent,
        targets: &TriggerTargets,
    ) -> Result<Dispatch, TriggerError> {
        let Some((handler, params)) = self.resolve(event.kind, &event.document) else {
            tracing::debug!("No trigger matched");
            return Ok(Dispatch::Unhandled);
        };

        match handler {
            TriggerHandler::AuthorizationCreated => {
                let uid = uid_param(&params)?;
                targets.claims.on_authorization_created(&uid).await?;
            }
            TriggerHandler::AuthorizationDeleted => {
                let uid = uid_param(&params)?;
                targets.claims.on_authorization_deleted(&uid).await?;
            }
            TriggerHandler::ProfileUpdated => {
                let uid = uid_param(&params)?;
                targets
                    .claims
                    .on_profile_updated(&uid, event.before.as_ref(), event.after.as_ref())
                    .await?;
            }
            TriggerHandler::FirstChatMessage => {
                let notifier = targets
                    .notifier
                    .as_ref()
                    .ok_or(TriggerError::NotifierUnavailable)?;
                let chat_id = params.get("chatId").ok_or(TriggerError::MissingParam("chatId"))?;
                let outcome = notifier
                    .on_message_created(chat_id, event.after.as_ref())
                    .await?;
                if outcome == NotifyOutcome::SendFailed {
                    tracing::warn!(chat_id, "Notification send failed, chat left un-notified");
                }
            }
        }

        tracing::info!(?handler, "Trigger handled");
        Ok(Dispatch::Handled(handler))
    }
}

fn uid_param(params: &Params) -> Result<Uid, TriggerError> {
    let raw = params.get("uid").ok_or(TriggerError::MissingParam("uid"))?;
    Ok(Uid::parse(raw)?)
}
