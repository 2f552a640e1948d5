//! In-process store for local development and tests.
//!
//! Implements all three store traits over plain maps. Unknown users read as
//! having no claims. Credential reads and writes are counted, and either
//! store can be switched into a failing mode.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use corretora_core::{CustomClaims, DocPath, Uid};
use tokio::sync::RwLock;

use super::{CredentialStore, Document, DocumentStore, StoreError, StoredDocument, TokenVerifier};

/// In-memory document store, credential store and token verifier.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    documents: RwLock<BTreeMap<DocPath, Document>>,
    claims: RwLock<HashMap<Uid, CustomClaims>>,
    tokens: RwLock<HashMap<String, Uid>>,
    claim_reads: AtomicUsize,
    claim_writes: AtomicUsize,
    fail_documents: AtomicBool,
    fail_credentials: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a document wholesale.
    pub async fn put_document(&self, path: DocPath, fields: Document) {
        self.inner.documents.write().await.insert(path, fields);
    }

    /// Delete a document.
    pub async fn remove_document(&self, path: &DocPath) {
        self.inner.documents.write().await.remove(path);
    }

    /// Read a document without going through the trait.
    pub async fn document(&self, path: &DocPath) -> Option<Document> {
        self.inner.documents.read().await.get(path).cloned()
    }

    /// Seed a user's claims without counting it as a write.
    pub async fn seed_claims(&self, uid: Uid, claims: CustomClaims) {
        self.inner.claims.write().await.insert(uid, claims);
    }

    /// Current claims for a user, if any were ever stored.
    pub async fn claims(&self, uid: &Uid) -> Option<CustomClaims> {
        self.inner.claims.read().await.get(uid).cloned()
    }

    /// Make `token` verify as `uid`.
    pub async fn register_token(&self, token: impl Into<String>, uid: Uid) {
        self.inner.tokens.write().await.insert(token.into(), uid);
    }

    /// Number of credential-store reads so far.
    #[must_use]
    pub fn claim_reads(&self) -> usize {
        self.inner.claim_reads.load(Ordering::SeqCst)
    }

    /// Number of credential-store writes so far.
    #[must_use]
    pub fn claim_writes(&self) -> usize {
        self.inner.claim_writes.load(Ordering::SeqCst)
    }

    /// Make every document-store call fail.
    pub fn fail_documents(&self, fail: bool) {
        self.inner.fail_documents.store(fail, Ordering::SeqCst);
    }

    /// Make every credential-store call fail.
    pub fn fail_credentials(&self, fail: bool) {
        self.inner.fail_credentials.store(fail, Ordering::SeqCst);
    }

    fn check_documents(&self) -> Result<(), StoreError> {
        if self.inner.fail_documents.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("document store offline".to_string()));
        }
        Ok(())
    }

    fn check_credentials(&self) -> Result<(), StoreError> {
        if self.inner.fail_credentials.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("credential store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        self.check_documents()?;
        Ok(self.document(path).await)
    }

    async fn merge(&self, path: &DocPath, fields: Document) -> Result<(), StoreError> {
        self.check_documents()?;
        let mut documents = self.inner.documents.write().await;
        let existing = documents.entry(path.clone()).or_default();
        for (key, value) in fields {
            existing.insert(key, value);
        }
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        self.check_documents()?;
        let collection = collection.trim_matches('/');
        Ok(self
            .inner
            .documents
            .read()
            .await
            .iter()
            .filter(|(path, _)| path.collection() == collection)
            .map(|(path, fields)| StoredDocument {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn custom_claims(&self, uid: &Uid) -> Result<CustomClaims, StoreError> {
        self.check_credentials()?;
        self.inner.claim_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.claims(uid).await.unwrap_or_default())
    }

    async fn set_custom_claims(&self, uid: &Uid, claims: &CustomClaims) -> Result<(), StoreError> {
        self.check_credentials()?;
        self.inner.claim_writes.fetch_add(1, Ordering::SeqCst);
        self.inner
            .claims
            .write()
            .await
            .insert(uid.clone(), claims.clone());
        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for MemoryStore {
    async fn verify_id_token(&self, token: &str) -> Result<Uid, StoreError> {
        self.inner
            .tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::InvalidToken("unknown token".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_merge_keeps_untouched_fields() {
        let store = MemoryStore::new();
        let path = DocPath::parse("news/a").unwrap();
        store
            .put_document(path.clone(), fields(json!({"title": "T", "summary": "S"})))
            .await;

        store
            .merge(&path, fields(json!({"tags": ["auto", "vida"]})))
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc["title"], json!("T"));
        assert_eq!(doc["summary"], json!("S"));
        assert_eq!(doc["tags"], json!(["auto", "vida"]));
    }

    #[tokio::test]
    async fn test_list_only_direct_children() {
        let store = MemoryStore::new();
        store
            .put_document(DocPath::parse("chats/c1").unwrap(), Document::new())
            .await;
        store
            .put_document(DocPath::parse("chats/c1/messages/m1").unwrap(), Document::new())
            .await;
        store
            .put_document(DocPath::parse("news/n1").unwrap(), Document::new())
            .await;

        let chats = store.list("chats").await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].path.as_str(), "chats/c1");

        let messages = store.list("chats/c1/messages").await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let store = MemoryStore::new();
        let uid = Uid::parse("u1").unwrap();

        store.fail_credentials(true);
        assert!(store.custom_claims(&uid).await.is_err());
        assert_eq!(store.claim_reads(), 0);

        store.fail_credentials(false);
        assert!(store.custom_claims(&uid).await.unwrap().is_empty());
        assert_eq!(store.claim_reads(), 1);
    }
}
