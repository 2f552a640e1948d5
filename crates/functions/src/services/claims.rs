//! Admin claim synchronization.
//!
//! Keeps the `admin` custom claim on a user's credential record in line with
//! the two authoritative sources in the document store:
//! - the authorization document `admins/{uid}` (existence means admin)
//! - the `isAdmin` flag on the profile document `users/{uid}`
//!
//! Every operation is a single read-decide-write. Writes are unconditional
//! and idempotent, so concurrent invocations for the same uid converge on the
//! same value without locking.

use std::sync::Arc;

use corretora_core::{CustomClaims, Uid, UserProfile, collections, derive_is_admin};
use thiserror::Error;
use tracing::instrument;

use crate::stores::{CredentialStore, Document, DocumentStore, StoreError};

/// Reading or writing a user's claims failed.
#[derive(Debug, Error)]
#[error("failed to update admin claim for {uid} (is_admin={is_admin}): {source}")]
pub struct ClaimUpdateError {
    pub uid: Uid,
    pub is_admin: bool,
    #[source]
    pub source: StoreError,
}

/// Errors from a full re-derivation of a user's admin state.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading the authoritative documents failed.
    #[error("failed to read authorization state: {0}")]
    Read(#[from] StoreError),

    /// Applying the derived claim failed.
    #[error(transparent)]
    Update(#[from] ClaimUpdateError),
}

/// Converges credential-store claims to document-store state.
#[derive(Clone)]
pub struct ClaimSynchronizer {
    documents: Arc<dyn DocumentStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl ClaimSynchronizer {
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            documents,
            credentials,
        }
    }

    /// Set or clear the `admin` claim, preserving every other claim.
    ///
    /// The full mapping is written back even when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `ClaimUpdateError` if the claims cannot be read or written.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn grant_or_revoke(
        &self,
        uid: &Uid,
        is_admin: bool,
    ) -> Result<CustomClaims, ClaimUpdateError> {
        let result = async {
            let mut claims = self.credentials.custom_claims(uid).await?;
            claims.apply_admin(is_admin);
            self.credentials.set_custom_claims(uid, &claims).await?;
            Ok::<_, StoreError>(claims)
        }
        .await;

        match result {
            Ok(claims) => {
                tracing::info!(uid = %uid, is_admin, "Admin claim applied");
                Ok(claims)
            }
            Err(source) => {
                tracing::error!(uid = %uid, is_admin, error = %source, "Admin claim update failed");
                Err(ClaimUpdateError {
                    uid: uid.clone(),
                    is_admin,
                    source,
                })
            }
        }
    }

    /// An authorization document was created.
    ///
    /// # Errors
    ///
    /// Returns `ClaimUpdateError` if the claim cannot be applied.
    pub async fn on_authorization_created(&self, uid: &Uid) -> Result<(), ClaimUpdateError> {
        self.grant_or_revoke(uid, true).await.map(|_| ())
    }

    /// An authorization document was deleted.
    ///
    /// # Errors
    ///
    /// Returns `ClaimUpdateError` if the claim cannot be applied.
    pub async fn on_authorization_deleted(&self, uid: &Uid) -> Result<(), ClaimUpdateError> {
        self.grant_or_revoke(uid, false).await.map(|_| ())
    }

    /// A profile document was updated.
    ///
    /// Only acts when the `isAdmin` flag actually flipped. Returns whether a
    /// claim update was performed.
    ///
    /// # Errors
    ///
    /// Returns `ClaimUpdateError` if the claim cannot be applied.
    pub async fn on_profile_updated(
        &self,
        uid: &Uid,
        before: Option<&Document>,
        after: Option<&Document>,
    ) -> Result<bool, ClaimUpdateError> {
        let previous = profile_flag(before);
        let next = profile_flag(after);

        if previous == next {
            tracing::debug!(uid = %uid, is_admin = next, "Profile admin flag unchanged");
            return Ok(false);
        }

        self.grant_or_revoke(uid, next).await?;
        Ok(true)
    }

    /// Recompute a user's admin state from both sources.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either document cannot be read.
    pub async fn derive_admin(&self, uid: &Uid) -> Result<bool, StoreError> {
        let authorization_exists = self.documents.exists(&collections::admin(uid)).await?;
        let profile = self
            .documents
            .get(&collections::user(uid))
            .await?
            .map(|fields| UserProfile::from_fields(&fields));

        Ok(derive_is_admin(authorization_exists, profile.as_ref()))
    }

    /// Re-derive and apply a user's admin claim. Returns the applied value.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the documents cannot be read or the claim
    /// cannot be applied.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn sync_user(&self, uid: &Uid) -> Result<bool, SyncError> {
        let is_admin = self.derive_admin(uid).await?;
        self.grant_or_revoke(uid, is_admin).await?;
        Ok(is_admin)
    }
}

fn profile_flag(fields: Option<&Document>) -> bool {
    fields.is_some_and(|f| UserProfile::from_fields(f).is_admin)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::stores::MemoryStore;

    fn synchronizer(store: &MemoryStore) -> ClaimSynchronizer {
        ClaimSynchronizer::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    fn uid(s: &str) -> Uid {
        Uid::parse(s).unwrap()
    }

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_grant_preserves_other_claims_and_always_writes() {
        let store = MemoryStore::new();
        let sync = synchronizer(&store);
        let user = uid("u1");
        store
            .seed_claims(
                user.clone(),
                serde_json::from_value(json!({"admin": true, "tier": "gold"})).unwrap(),
            )
            .await;

        sync.grant_or_revoke(&user, true).await.unwrap();

        assert_eq!(store.claim_writes(), 1, "no-op grants still write");
        let claims = store.claims(&user).await.unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.get("tier"), Some(&json!("gold")));
    }

    #[tokio::test]
    async fn test_revoke_removes_key() {
        let store = MemoryStore::new();
        let sync = synchronizer(&store);
        let user = uid("u1");
        store
            .seed_claims(user.clone(), serde_json::from_value(json!({"admin": true})).unwrap())
            .await;

        sync.on_authorization_deleted(&user).await.unwrap();

        let claims = store.claims(&user).await.unwrap();
        assert!(claims.get("admin").is_none());
    }

    #[tokio::test]
    async fn test_failure_carries_uid_and_flag() {
        let store = MemoryStore::new();
        let sync = synchronizer(&store);
        store.fail_credentials(true);

        let err = sync.grant_or_revoke(&uid("u9"), true).await.unwrap_err();
        assert_eq!(err.uid.as_str(), "u9");
        assert!(err.is_admin);
        assert!(matches!(err.source, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_profile_update_edge_trigger() {
        let store = MemoryStore::new();
        let sync = synchronizer(&store);
        let user = uid("u1");

        let before = doc(json!({"displayName": "Ana"}));
        let after = doc(json!({"displayName": "Ana Silva", "isAdmin": false}));
        assert!(!sync.on_profile_updated(&user, Some(&before), Some(&after)).await.unwrap());
        assert_eq!(store.claim_reads(), 0);
        assert_eq!(store.claim_writes(), 0);

        let after = doc(json!({"displayName": "Ana", "isAdmin": true}));
        assert!(sync.on_profile_updated(&user, Some(&before), Some(&after)).await.unwrap());
        assert!(store.claims(&user).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_sync_user_or_semantics() {
        let store = MemoryStore::new();
        let sync = synchronizer(&store);
        let user = uid("u1");
        store
            .put_document(collections::admin(&user), Document::new())
            .await;
        store
            .put_document(collections::user(&user), doc(json!({"isAdmin": false})))
            .await;

        assert!(sync.sync_user(&user).await.unwrap());
        assert!(store.claims(&user).await.unwrap().is_admin());

        store.remove_document(&collections::admin(&user)).await;
        assert!(!sync.sync_user(&user).await.unwrap());
        assert!(!store.claims(&user).await.unwrap().is_admin());
    }
}
