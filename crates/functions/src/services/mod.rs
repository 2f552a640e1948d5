//! Business logic behind the HTTP routes and document triggers.

pub mod claims;
pub mod completion;
pub mod email;
pub mod news;
pub mod notifier;

pub use claims::{ClaimSynchronizer, ClaimUpdateError, SyncError};
pub use completion::{ChatMessage, CompletionError, CompletionProvider, OpenAiClient};
pub use email::{EmailError, EmailJsClient, EmailReply, EmailSender};
pub use news::{BackfillReport, NewsError, NewsInput, NewsService, UpsertOutcome};
pub use notifier::{FirstMessageNotifier, NotifyOutcome};
