//! Access to the external document store and credential store.
//!
//! Handlers depend only on the traits defined here, so the Google-backed
//! adapters can be swapped for [`MemoryStore`] in tests and local runs.
//!
//! # Implementations
//!
//! - [`FirestoreStore`] - Firestore REST v1 (`DocumentStore`)
//! - [`IdentityToolkit`] - Identity Toolkit REST v1 (`CredentialStore`, `TokenVerifier`)
//! - [`MemoryStore`] - In-process implementation of all three traits

mod firestore;
mod identity;
mod memory;

use async_trait::async_trait;
use corretora_core::{CustomClaims, DocPath, Uid};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::google::GoogleAuthError;

pub use firestore::FirestoreStore;
pub use identity::IdentityToolkit;
pub use memory::MemoryStore;

/// The fields of a stored document.
pub type Document = Map<String, Value>;

/// A document read back from a collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub path: DocPath,
    pub fields: Document,
}

/// Errors that can occur when talking to either store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Could not obtain an access token.
    #[error("auth error: {0}")]
    Auth(#[from] GoogleAuthError),

    /// The requested user record does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// A response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Claims were rejected before being sent.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// An identity token failed verification.
    #[error("invalid id token: {0}")]
    InvalidToken(String),

    /// The backend is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Document database with point reads, merge writes, and collection listing.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. Returns `None` if it does not exist.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// Whether a document exists.
    async fn exists(&self, path: &DocPath) -> Result<bool, StoreError> {
        Ok(self.get(path).await?.is_some())
    }

    /// Merge-write the given top-level fields, creating the document if needed.
    /// Fields not listed are left untouched.
    async fn merge(&self, path: &DocPath, fields: Document) -> Result<(), StoreError>;

    /// List every document directly inside a collection.
    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;
}

/// Authentication service holding per-user custom claims.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read a user's custom claims. A user without claims yields an empty mapping.
    async fn custom_claims(&self, uid: &Uid) -> Result<CustomClaims, StoreError>;

    /// Replace a user's custom claims with the given mapping.
    async fn set_custom_claims(&self, uid: &Uid, claims: &CustomClaims) -> Result<(), StoreError>;
}

/// Verifier for identity tokens issued to signed-in users.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token and return the uid it was issued to.
    async fn verify_id_token(&self, token: &str) -> Result<Uid, StoreError>;
}
